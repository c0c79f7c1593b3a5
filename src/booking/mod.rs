pub mod cart;
pub mod checkout;
pub mod confirmation;
pub mod page;
pub mod pricing;
pub mod receipt;

pub use cart::{TicketSelection, TicketTypeView, MAX_TICKETS_PER_BOOKING};
pub use checkout::{run_checkout, CheckoutReceipt, CheckoutState, PaymentConfirmation, PaymentWidget, WidgetEvent};
pub use confirmation::load_confirmation;
pub use page::{booking_path, BookingPage, BookingView};
pub use pricing::{to_minor_units, OrderTotals, TAX_RATE};
pub use receipt::{receipt_file_name, render_pdf, save_receipt};
