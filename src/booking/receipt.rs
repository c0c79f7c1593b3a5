//! PDF с билетами заказа.
//!
//! Раскладка считается отдельно от отрисовки: `layout` возвращает страницы с элементами
//! в миллиметрах от верхнего левого угла A4, `render_pdf` переносит их в printpdf.

use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb};
use qrcode::QrCode;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::OrderDetails;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

const MARGIN_X: f32 = 20.0;
const FIRST_TICKET_Y: f32 = 140.0;
const TICKET_STEP: f32 = 70.0;
const PAGE_BREAK_AFTER: f32 = 250.0;
const NEW_PAGE_Y: f32 = 20.0;
const QR_SIZE: f32 = 30.0;
const BRAND_COLOR: (u8, u8, u8) = (102, 102, 255);
pub const FOOTER: &str = "This is an electronically generated document.";

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptItem {
    Text {
        x: f32,
        y: f32,
        size: f32,
        text: String,
        color: Option<(u8, u8, u8)>,
    },
    Qr {
        x: f32,
        y: f32,
        size: f32,
        data: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptPage {
    pub items: Vec<ReceiptItem>,
}

impl ReceiptPage {
    fn text(&mut self, x: f32, y: f32, size: f32, text: impl Into<String>) {
        self.items.push(ReceiptItem::Text {
            x,
            y,
            size,
            text: text.into(),
            color: None,
        });
    }
}

pub fn receipt_file_name(order_id: &str) -> String {
    format!("tickets-{}.pdf", order_id)
}

/// Раскладка квитанции по страницам.
pub fn layout(order: &OrderDetails) -> Vec<ReceiptPage> {
    let mut first = ReceiptPage::default();
    first.items.push(ReceiptItem::Text {
        x: MARGIN_X,
        y: 20.0,
        size: 22.0,
        text: "Veritas".to_string(),
        color: Some(BRAND_COLOR),
    });
    first.text(MARGIN_X, 40.0, 18.0, "Booking Confirmation");
    first.text(MARGIN_X, 60.0, 12.0, format!("Order ID: {}", order.order_id));
    first.text(MARGIN_X, 70.0, 12.0, format!("Concert: {}", order.concert_name));
    first.text(MARGIN_X, 80.0, 12.0, format!("Amount Paid: INR {:.2}", order.amount));
    first.text(
        MARGIN_X,
        90.0,
        12.0,
        format!("Name: {}", order.user_name.as_deref().unwrap_or("N/A")),
    );
    first.text(
        MARGIN_X,
        100.0,
        12.0,
        format!("Email: {}", order.user_email.as_deref().unwrap_or("N/A")),
    );
    first.text(MARGIN_X, 120.0, 14.0, "Your Tickets:");

    let mut pages = vec![first];
    let mut y = FIRST_TICKET_Y;
    for ticket in &order.tickets {
        // Новую страницу заводим только под билет, пустых страниц не бывает
        if y > PAGE_BREAK_AFTER {
            pages.push(ReceiptPage::default());
            y = NEW_PAGE_Y;
        }
        let Some(page) = pages.last_mut() else { break };
        page.text(MARGIN_X, y, 12.0, format!("Ticket Type: {}", ticket.ticket_type));
        page.text(MARGIN_X, y + 10.0, 12.0, format!("Ticket Code: {}", ticket.code));
        page.items.push(ReceiptItem::Qr {
            x: MARGIN_X,
            y: y + 20.0,
            size: QR_SIZE,
            data: ticket.code.clone(),
        });
        y += TICKET_STEP;
    }

    for page in &mut pages {
        page.text(MARGIN_X, PAGE_HEIGHT_MM - 20.0, 10.0, FOOTER);
    }
    pages
}

fn to_pdf_y(top: f32) -> Mm {
    Mm(PAGE_HEIGHT_MM - top)
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

fn draw_qr(layer: &PdfLayerReference, x: f32, top: f32, size: f32, data: &str) -> AppResult<()> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| AppError::Receipt(e.to_string()))?;
    let width = code.width();
    let module = size / width as f32;

    layer.set_fill_color(rgb((0, 0, 0)));
    for (idx, color) in code.to_colors().into_iter().enumerate() {
        if color != qrcode::Color::Dark {
            continue;
        }
        let (col, row) = ((idx % width) as f32, (idx / width) as f32);
        let left = x + col * module;
        let cell_top = top + row * module;
        layer.add_rect(Rect::new(
            Mm(left),
            to_pdf_y(cell_top + module),
            Mm(left + module),
            to_pdf_y(cell_top),
        ));
    }
    Ok(())
}

fn draw_page(layer: &PdfLayerReference, font: &IndirectFontRef, page: &ReceiptPage) -> AppResult<()> {
    for item in &page.items {
        match item {
            ReceiptItem::Text { x, y, size, text, color } => {
                layer.set_fill_color(rgb(color.unwrap_or((0, 0, 0))));
                layer.use_text(text.as_str(), *size, Mm(*x), to_pdf_y(*y), font);
            }
            ReceiptItem::Qr { x, y, size, data } => draw_qr(layer, *x, *y, *size, data)?,
        }
    }
    Ok(())
}

/// Отрисовывает квитанцию в байты PDF.
pub fn render_pdf(order: &OrderDetails) -> AppResult<Vec<u8>> {
    let pages = layout(order);
    let title = format!("Veritas tickets {}", order.order_id);
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Tickets");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Receipt(e.to_string()))?;

    for (idx, page) in pages.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), format!("Tickets {}", idx + 1));
            doc.get_page(page_idx).get_layer(layer_idx)
        };
        draw_page(&layer, &font, page)?;
    }

    doc.save_to_bytes().map_err(|e| AppError::Receipt(e.to_string()))
}

/// Пишет `tickets-{orderId}.pdf` в каталог и возвращает путь.
pub async fn save_receipt(order: &OrderDetails, dir: &Path) -> AppResult<PathBuf> {
    let bytes = render_pdf(order)?;
    let path = dir.join(receipt_file_name(&order.order_id));
    tokio::fs::write(&path, &bytes).await?;
    info!("✅ Tickets downloaded successfully: {}", path.display());
    Ok(path)
}
