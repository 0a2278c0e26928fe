//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::encoding::{CODE_TABLE_WPC1252, encode_text, pad_width, text_width, truncate_width};
use crate::error::{PrintError, PrintResult};

/// ESC @ - Initialize printer
pub const INIT: [u8; 2] = [0x1B, 0x40];

/// GS V 66 0 - Feed to the cutter and perform a full cut
pub const CUT_FULL: [u8; 4] = [0x1D, 0x56, 0x42, 0x00];

/// ESC p 0 50 150 - Cash drawer kick on pin 2 (100ms on, 300ms off)
pub const DRAWER_PULSE: [u8; 5] = [0x1B, 0x70, 0x00, 0x32, 0x96];

/// GS k 73 - CODE128 barcode with a length-prefixed payload
const BARCODE_CODE128: [u8; 3] = [0x1D, 0x6B, 0x49];

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// Text is converted to Windows-1252 as it is written.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(1024);
        buf.extend_from_slice(&INIT);
        // Initialization resets the code table, select WPC1252 right after
        buf.extend_from_slice(&[0x1B, 0x74, CODE_TABLE_WPC1252]);
        Self { buf, width }
    }

    // === Text Output ===

    /// Write text (converted to Windows-1252)
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(&encode_text(s));
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Text Style ===

    /// Enable bold text
    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn sep_double(&mut self) -> &mut Self {
        self.line(&"=".repeat(self.width))
    }

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.width))
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with spaces filling the gap. When both do not fit, the left text
    /// gets its own line and the right text is cut to the paper width.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw < self.width {
            let spaces = self.width - lw - rw;
            self.text(left);
            self.text(&" ".repeat(spaces));
            self.line(right)
        } else {
            self.line(&truncate_width(left, self.width));
            self.line(&pad_width(right, self.width, true))
        }
    }

    // === Barcode ===

    /// Print a CODE128 barcode with human readable text below it
    ///
    /// The payload is written after a single length byte, so it must be
    /// 1..=255 bytes of printable ASCII.
    pub fn barcode_code128(&mut self, data: &str) -> PrintResult<&mut Self> {
        let len = u8::try_from(data.len()).map_err(|_| {
            PrintError::InvalidBarcode(format!("payload is {} bytes, limit is 255", data.len()))
        })?;
        if len == 0 {
            return Err(PrintError::InvalidBarcode("empty payload".to_string()));
        }
        if !data.bytes().all(|b| (0x20..0x7F).contains(&b)) {
            return Err(PrintError::InvalidBarcode(
                "payload must be printable ASCII".to_string(),
            ));
        }

        // GS h n - Barcode height in dots
        self.buf.extend_from_slice(&[0x1D, 0x68, 80]);
        // GS w n - Module width
        self.buf.extend_from_slice(&[0x1D, 0x77, 2]);
        // GS H n - HRI characters below the barcode
        self.buf.extend_from_slice(&[0x1D, 0x48, 0x02]);

        self.buf.extend_from_slice(&BARCODE_CODE128);
        self.buf.push(len);
        self.buf.extend_from_slice(data.as_bytes());
        self.buf.push(b'\n');
        Ok(self)
    }

    // === Paper Control ===

    /// Feed to the cutter and perform a full cut (GS V 66 0)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&CUT_FULL);
        self
    }

    // === Cash Drawer ===

    /// Open cash drawer (pin 2)
    pub fn open_drawer(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&DRAWER_PULSE);
        self
    }

    // === Build ===

    /// Build the final byte buffer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_starts_with_init() {
        let mut b = EscPosBuilder::new(32);
        b.center().double_size().line("RECEIPT").reset_size().left();

        let data = b.build();
        assert_eq!(&data[..2], &INIT);
        assert_eq!(&data[2..5], &[0x1B, 0x74, 16]);
    }

    #[test]
    fn test_line_lr() {
        let mut b = EscPosBuilder::new(20);
        b.line_lr("Fee", "5.00");

        let data = b.build();
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("Fee             5.00\n"));
    }

    #[test]
    fn test_line_lr_overflow_wraps() {
        let mut b = EscPosBuilder::new(10);
        b.line_lr("Recipient:", "Kwabena Ofori-Atta");

        let data = b.build();
        let s = String::from_utf8_lossy(&data[5..]);
        assert_eq!(s, "Recipient:\nKwabena Of\n");
    }

    #[test]
    fn test_line_lr_right_text_right_aligned_when_wrapped() {
        let mut b = EscPosBuilder::new(12);
        b.line_lr("Receipt No:", "RJB-42");

        let data = b.build();
        let s = String::from_utf8_lossy(&data[5..]);
        assert_eq!(s, "Receipt No:\n      RJB-42\n");
    }

    #[test]
    fn test_separators() {
        let mut b = EscPosBuilder::new(10);
        b.sep_double();

        let data = b.build();
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("=========="));
    }

    #[test]
    fn test_latin_text_is_single_byte() {
        let mut b = EscPosBuilder::new(32);
        b.text("Zoë");

        let data = b.build();
        assert_eq!(&data[data.len() - 3..], &[b'Z', b'o', 0xEB]);
    }

    #[test]
    fn test_barcode_length_prefix() {
        let mut b = EscPosBuilder::new(48);
        b.barcode_code128("RJB-000123").unwrap();

        let data = b.build();
        let pos = data
            .windows(3)
            .position(|w| w == BARCODE_CODE128)
            .expect("barcode command present");
        assert_eq!(data[pos + 3], 10);
        assert_eq!(&data[pos + 4..pos + 14], b"RJB-000123");
    }

    #[test]
    fn test_barcode_rejects_oversized_payload() {
        let mut b = EscPosBuilder::new(48);
        let long = "X".repeat(256);
        assert!(matches!(
            b.barcode_code128(&long),
            Err(PrintError::InvalidBarcode(_))
        ));

        // Nothing of the barcode block was written
        let data = b.build();
        assert!(!data.windows(3).any(|w| w == BARCODE_CODE128));
    }

    #[test]
    fn test_barcode_accepts_255_bytes() {
        let mut b = EscPosBuilder::new(48);
        let max = "9".repeat(255);
        assert!(b.barcode_code128(&max).is_ok());
    }

    #[test]
    fn test_cut_and_drawer_bytes() {
        let mut b = EscPosBuilder::new(48);
        b.cut().open_drawer();

        let data = b.build();
        assert_eq!(&data[data.len() - 9..data.len() - 5], &CUT_FULL);
        assert_eq!(&data[data.len() - 5..], &DRAWER_PULSE);
    }
}
