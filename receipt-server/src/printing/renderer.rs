//! Remittance receipt renderer
//!
//! Renders Transaction data into ESC/POS format for thermal printers.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use remit_printer::EscPosBuilder;
use shared::{PrinterStatus, Transaction};

use super::error::EncodingError;

/// Printed when the transaction carries no client name
const CLIENT_PLACEHOLDER: &str = "Walk-in Client";

/// Largest payload the one-byte barcode length prefix can describe
const MAX_BARCODE_LEN: usize = 255;

/// Turns records into printer command streams
///
/// Implementations must be pure: the same input and `printed_at` always
/// yield the same bytes.
pub trait ReceiptEncoder: Send + Sync {
    /// Encode a transaction receipt
    fn encode(
        &self,
        transaction: &Transaction,
        printed_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, EncodingError>;

    /// Encode a printer self-test ticket
    fn render_test_page(&self, status: &PrinterStatus, printed_at: DateTime<Utc>) -> Vec<u8>;
}

/// Static parts of the receipt
#[derive(Debug, Clone)]
pub struct ReceiptLayout {
    /// Characters per line (58mm: 32, 80mm: 48)
    pub width: usize,
    pub business_name: String,
    /// Address, phone, licence number...
    pub header_lines: Vec<String>,
    pub footer_lines: Vec<String>,
    /// Zone used for every printed date and time
    pub timezone: Tz,
    /// Kick the cash drawer after the cut
    pub open_drawer: bool,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self {
            width: 48,
            business_name: "Remittance Receipt".to_string(),
            header_lines: Vec::new(),
            footer_lines: vec!["Thank you for your business!".to_string()],
            timezone: Tz::UTC,
            open_drawer: false,
        }
    }
}

/// Receipt renderer
///
/// Block order: header, metadata, client, financials, barcode, footer, cut,
/// optional drawer pulse.
#[derive(Debug, Clone, Default)]
pub struct ReceiptRenderer {
    layout: ReceiptLayout,
}

impl ReceiptRenderer {
    pub fn new(layout: ReceiptLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ReceiptLayout {
        &self.layout
    }

    /// Render a transaction receipt to ESC/POS bytes
    pub fn render(
        &self,
        tx: &Transaction,
        printed_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, EncodingError> {
        validate_transaction(tx)?;
        let receipt_id = tx.receipt_id();
        validate_receipt_id(receipt_id)?;

        let mut b = EscPosBuilder::new(self.layout.width);

        self.render_header(&mut b);
        self.render_metadata(&mut b, tx, receipt_id);
        self.render_client(&mut b, tx);
        self.render_financials(&mut b, tx);

        b.center();
        b.barcode_code128(receipt_id)
            .map_err(EncodingError::Barcode)?;

        self.render_footer(&mut b, printed_at);

        b.cut();
        if self.layout.open_drawer {
            b.open_drawer();
        }

        Ok(b.build())
    }

    fn render_header(&self, b: &mut EscPosBuilder) {
        b.center();
        b.double_size();
        b.bold();
        b.line(&self.layout.business_name);
        b.bold_off();
        b.reset_size();

        for line in &self.layout.header_lines {
            b.line(line);
        }
        b.line("MONEY TRANSFER RECEIPT");
        b.sep_double();
    }

    fn render_metadata(&self, b: &mut EscPosBuilder, tx: &Transaction, receipt_id: &str) {
        let created = tx.created_at.with_timezone(&self.layout.timezone);

        b.left();
        b.line_lr("Receipt No:", receipt_id);
        b.line_lr("Date:", &created.format("%Y-%m-%d").to_string());
        b.line_lr("Time:", &created.format("%H:%M:%S").to_string());
        if !tx.format_id.is_empty() {
            b.line_lr("Ref:", &tx.format_id);
        }
        if !tx.transaction_type.is_empty() {
            b.line_lr("Type:", &tx.transaction_type.to_uppercase());
        }
        b.sep_single();
    }

    fn render_client(&self, b: &mut EscPosBuilder, tx: &Transaction) {
        let name = tx.client_name.trim();
        let name = if name.is_empty() { CLIENT_PLACEHOLDER } else { name };

        b.bold();
        b.line("CLIENT");
        b.bold_off();
        b.line_lr("Name:", name);
        if let Some(email) = tx.client_email.as_deref().filter(|e| !e.is_empty()) {
            b.line_lr("Email:", email);
        }
        if let Some(phone) = tx.phone_number.as_deref().filter(|p| !p.is_empty()) {
            b.line_lr("Phone:", phone);
        }
        b.sep_single();
    }

    fn render_financials(&self, b: &mut EscPosBuilder, tx: &Transaction) {
        let from = tx.from_currency.to_uppercase();
        let to = tx.to_currency.to_uppercase();

        b.line_lr("Amount:", &format!("{} {}", format_grouped(tx.amount, 2), from));
        b.line_lr("From:", &from);
        b.line_lr("To:", &to);
        b.line_lr(
            "Rate:",
            &format!("1 {} = {:.4} {}", from, tx.exchange_rate, to),
        );
        b.line_lr("Fee:", &format!("{} {}", format_grouped(tx.fee, 2), from));
        b.line_lr(
            "Total Paid:",
            &format!("{} {}", format_grouped(tx.total_paid(), 2), from),
        );
        b.line_lr(
            "Recipient Gets:",
            &format!("{} {}", format_grouped(tx.converted_amount(), 2), to),
        );
        b.sep_single();

        b.bold();
        b.line_lr("Status:", &tx.status.to_uppercase());
        b.bold_off();
        b.sep_double();
    }

    fn render_footer(&self, b: &mut EscPosBuilder, printed_at: DateTime<Utc>) {
        b.center();
        for line in &self.layout.footer_lines {
            b.line(line);
        }
        b.line(&format!("Printed: {}", self.format_local(printed_at)));
        b.newline();
    }

    fn format_local(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.layout.timezone)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

impl ReceiptEncoder for ReceiptRenderer {
    fn encode(
        &self,
        transaction: &Transaction,
        printed_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, EncodingError> {
        self.render(transaction, printed_at)
    }

    fn render_test_page(&self, status: &PrinterStatus, printed_at: DateTime<Utc>) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.layout.width);

        b.center();
        b.double_size();
        b.line("PRINTER TEST");
        b.reset_size();
        b.line(&self.layout.business_name);
        b.sep_double();

        b.left();
        b.line_lr("Model:", &status.model);
        b.line_lr("Connected:", if status.connected { "YES" } else { "NO" });
        b.line_lr("Paper:", &format!("{}%", status.paper_level));
        b.line_lr("Temperature:", &status.temperature.to_string());
        b.sep_single();
        if status.errors.is_empty() {
            b.line("No errors reported");
        } else {
            for error in &status.errors {
                b.line(&format!("! {}", error));
            }
        }
        b.sep_double();

        b.center();
        b.line(&format!("Printed: {}", self.format_local(printed_at)));
        b.newline();
        b.cut();

        b.build()
    }
}

fn validate_transaction(tx: &Transaction) -> Result<(), EncodingError> {
    for (field, value) in [
        ("amount", tx.amount),
        ("exchange_rate", tx.exchange_rate),
        ("fee", tx.fee),
    ] {
        if !value.is_finite() {
            return Err(EncodingError::NonFinite { field, value });
        }
    }
    if tx.amount < 0.0 {
        return Err(EncodingError::NegativeAmount(tx.amount));
    }
    for code in [&tx.from_currency, &tx.to_currency] {
        if code.len() != 3 || !code.bytes().all(|c| c.is_ascii_alphabetic()) {
            return Err(EncodingError::InvalidCurrency(code.clone()));
        }
    }
    Ok(())
}

fn validate_receipt_id(id: &str) -> Result<(), EncodingError> {
    if id.is_empty() {
        return Err(EncodingError::EmptyId);
    }
    if id.len() > MAX_BARCODE_LEN {
        return Err(EncodingError::IdTooLong { len: id.len() });
    }
    if !id.bytes().all(|c| (0x20..0x7F).contains(&c)) {
        return Err(EncodingError::NonAsciiId);
    }
    Ok(())
}

/// Format a number with comma thousands grouping, e.g. `1234567.5` → `1,234,567.50`
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }

    if value < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
