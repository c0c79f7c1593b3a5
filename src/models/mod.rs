pub mod user;
pub mod concert;
pub mod ticket;
pub mod order;
pub mod song;

pub use user::{AuthResponse, Role, User};
pub use concert::{Concert, ConcertForm};
pub use ticket::{TicketPage, TicketPageType, TicketType};
pub use order::{OrderDetails, OrderRequest, TicketDetail};
pub use song::{ChartSong, ChartType, MatchOutcome, MatchResult, TicketStatus, TicketVerification};

use serde::{Deserialize, Deserializer};

/// Java-бэкенд отдает `null` вместо пустых списков: считаем это значением по умолчанию.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
