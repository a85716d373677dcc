#![forbid(unsafe_code)]
//! QR code encoding.
//!
//! This module turns a byte string and an error correction level into a QR Code Model 2 symbol
//! (versions 1–40). Data is always carried in a single byte-mode segment; the smallest version
//! that fits is chosen and the error correction level is never changed behind the caller's back.
use serde::{Deserialize, Serialize};

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Instances are immutable after creation. Besides the module colors, the symbol remembers which
/// modules belong to function patterns (finders, separators, timing, alignment, format and
/// version areas) so that renderers can style data modules without disturbing them.
///
/// # Example
///
/// ```rust
/// use qrstyle::qrcode::{QrCode, QrCodeEcc};
///
/// let qr = QrCode::encode_text("Hello, World!", QrCodeEcc::Medium).unwrap();
///
/// assert_eq!(qr.version().value(), 1);
/// assert_eq!(qr.size(), 21);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrCode {
    /// The version number of this QR Code, which is between 1 and 40 (inclusive).
    version: Version,

    /// The width and height of this QR Code, measured in modules, between
    /// 21 and 177 (inclusive). This is equal to version * 4 + 17.
    size: i32,

    /// The error correction level used in this QR Code.
    errorcorrectionlevel: QrCodeEcc,

    /// The mask pattern written into the format information.
    mask: Mask,

    /// The modules of this QR Code (false = light, true = dark), row-major.
    modules: Vec<bool>,

    /// Indicates function modules that are not subjected to masking.
    isfunction: Vec<bool>,
}

impl QrCode {
    /// Encodes a text string into a QR code.
    ///
    /// The UTF-8 bytes of `text` are placed in a byte-mode segment and the smallest version that
    /// can hold them at the requested error correction level is selected.
    ///
    /// # Arguments
    ///
    /// * `text` - The text to encode. Must not be empty.
    /// * `ecl` - Error correction level.
    ///
    /// # Returns
    ///
    /// The QR code, or an [`EncodingError`] if the text is empty or does not fit in version 40.
    pub fn encode_text(text: &str, ecl: QrCodeEcc) -> Result<Self, EncodingError> {
        Self::encode_binary(text.as_bytes(), ecl)
    }

    /// Encodes arbitrary bytes into a QR code with automatic mask selection.
    pub fn encode_binary(data: &[u8], ecl: QrCodeEcc) -> Result<Self, EncodingError> {
        Self::encode_with_mask(data, ecl, None)
    }

    /// Encodes bytes into a QR code, optionally forcing a mask pattern.
    ///
    /// When `mask` is `None`, all eight patterns are evaluated and the one with the lowest
    /// penalty score wins, ties going to the lower mask number.
    pub fn encode_with_mask(
        data: &[u8],
        ecl: QrCodeEcc,
        mask: Option<Mask>
    ) -> Result<Self, EncodingError> {
        if data.is_empty() {
            return Err(EncodingError::EmptyContent);
        }

        // Find the minimal version number to use
        let version = (Version::MIN.value()..=Version::MAX.value())
            .map(Version::new)
            .find(|&ver| data.len() <= Self::byte_capacity(ver, ecl))
            .ok_or(EncodingError::DataTooLong {
                len: data.len(),
                max: Self::byte_capacity(Version::MAX, ecl),
            })?;

        let datacapacitybits: usize = Self::get_num_data_codewords(version, ecl) * 8;
        let mut bb = BitBuffer::new();
        bb.append_bits(BYTE_MODE_INDICATOR, 4);
        bb.append_bits(data.len() as u32, Self::char_count_bits(version));
        for &b in data {
            bb.append_bits(b.into(), 8);
        }
        debug_assert!(bb.len() <= datacapacitybits);

        // Add terminator and pad up to a byte if applicable
        let numzerobits: usize = core::cmp::min(4, datacapacitybits - bb.len());
        bb.append_bits(0, numzerobits as u8);
        let numzerobits: usize = bb.len().wrapping_neg() & 7;
        bb.append_bits(0, numzerobits as u8);
        debug_assert_eq!(bb.len() % 8, 0);

        // Pad with alternating bytes until data capacity is reached
        for &padbyte in [0xec, 0x11].iter().cycle() {
            if bb.len() >= datacapacitybits {
                break;
            }
            bb.append_bits(padbyte, 8);
        }

        Ok(Self::encode_codewords(version, ecl, &bb.into_bytes(), mask))
    }

    /// Creates a new QR Code with the given version number,
    /// error correction level, data codeword bytes, and mask number.
    ///
    /// This is a low-level API; `datacodewords` must already be padded to the exact data
    /// capacity of `version` at `ecl`.
    pub fn encode_codewords(
        version: Version,
        ecl: QrCodeEcc,
        datacodewords: &[u8],
        mask: Option<Mask>
    ) -> Self {
        let size = i32::from(version.value()) * 4 + 17;
        let cells = (size * size) as usize;
        let mut result = Self {
            version,
            size,
            errorcorrectionlevel: ecl,
            mask: Mask::new(0),
            modules: vec![false; cells],
            isfunction: vec![false; cells],
        };

        result.draw_function_patterns();
        let allcodewords: Vec<u8> = Self::add_ecc_and_interleave(datacodewords, version, ecl);
        result.draw_codewords(&allcodewords);

        let mask: Mask = mask.unwrap_or_else(|| result.choose_mask().0);
        result.with_mask(mask)
    }

    /// Returns the number of content bytes a byte-mode segment can carry in the given
    /// version at the given error correction level.
    pub fn byte_capacity(ver: Version, ecl: QrCodeEcc) -> usize {
        let databits = Self::get_num_data_codewords(ver, ecl) * 8;
        let overhead = 4 + usize::from(Self::char_count_bits(ver));
        databits.saturating_sub(overhead) / 8
    }

    /// Returns `(number of blocks, error correction codewords per block)` for the given
    /// version and level.
    pub fn ecc_block_layout(ver: Version, ecl: QrCodeEcc) -> (usize, usize) {
        (
            Self::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl),
            Self::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl),
        )
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Returns this QR Code's error correction level.
    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.errorcorrectionlevel
    }

    /// Returns this QR Code's mask, in the range [0, 7].
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules. Coordinates outside the QR
    /// code's bounds return `false`.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.modules[self.index(x, y)]
    }

    /// Returns whether the module at the given coordinates is part of a function pattern.
    /// Coordinates outside the symbol return `false`.
    pub fn is_function_module(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.isfunction[self.index(x, y)]
    }

    /// Computes the penalty score of the current module layout, as used for mask selection.
    pub fn penalty_score(&self) -> i32 {
        let mut result: i32 = 0;
        let size: i32 = self.size;

        // Adjacent modules in row having same color, and finder-like patterns
        for y in 0..size {
            result += self.line_penalty(|i| self.modules[self.index(i, y)]);
        }
        // Adjacent modules in column having same color, and finder-like patterns
        for x in 0..size {
            result += self.line_penalty(|i| self.modules[self.index(x, i)]);
        }

        // 2*2 blocks of modules having same color
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color: bool = self.get_module(x, y);
                if
                    color == self.get_module(x + 1, y) &&
                    color == self.get_module(x, y + 1) &&
                    color == self.get_module(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        // Balance of dark and light modules
        let dark = self.modules.iter().filter(|&&m| m).count() as i32;
        let total = size * size;
        let k: i32 = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result += k * PENALTY_N4;
        result
    }

    /// Evaluates all eight masks against the unmasked layout and returns the winner and
    /// its penalty. Every candidate is an independent copy; ties go to the lower index.
    fn choose_mask(&self) -> (Mask, i32) {
        let mut best = (Mask::new(0), i32::MAX);
        for i in 0u8..8 {
            let mask = Mask::new(i);
            let penalty: i32 = self.with_mask(mask).penalty_score();
            if penalty < best.1 {
                best = (mask, penalty);
            }
        }
        best
    }

    /// Returns a copy of this layout with the mask applied and the format bits written.
    fn with_mask(&self, mask: Mask) -> Self {
        let mut candidate = self.clone();
        candidate.apply_mask(mask);
        candidate.draw_format_bits(mask);
        candidate.mask = mask;
        candidate
    }

    fn line_penalty(&self, module_at: impl Fn(i32) -> bool) -> i32 {
        let mut result: i32 = 0;
        let mut runcolor = false;
        let mut runlen: i32 = 0;
        let mut runhistory = FinderPenalty::new(self.size);
        for i in 0..self.size {
            let color = module_at(i);
            if color == runcolor {
                runlen += 1;
                if runlen == 5 {
                    result += PENALTY_N1;
                } else if runlen > 5 {
                    result += 1;
                }
            } else {
                runhistory.add_history(runlen);
                if !runcolor {
                    result += runhistory.count_patterns() * PENALTY_N3;
                }
                runcolor = color;
                runlen = 1;
            }
        }
        result + runhistory.terminate_and_count(runcolor, runlen) * PENALTY_N3
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size;
        range.contains(&x) && range.contains(&y)
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.size + x) as usize
    }

    fn set_function_module(&mut self, x: i32, y: i32, isdark: bool) {
        let index = self.index(x, y);
        self.modules[index] = isdark;
        self.isfunction[index] = true;
    }

    fn draw_function_patterns(&mut self) {
        let size: i32 = self.size;

        // Timing patterns
        for i in 0..size {
            self.set_function_module(6, i, i % 2 == 0);
            self.set_function_module(i, 6, i % 2 == 0);
        }

        // Finder patterns, with their separators
        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        // Alignment patterns, skipping the three finder corners
        let alignpatpos: Vec<i32> = self.get_alignment_pattern_positions();
        let numalign: usize = alignpatpos.len();
        for i in 0..numalign {
            for j in 0..numalign {
                if
                    (i == 0 && j == 0) ||
                    (i == 0 && j == numalign - 1) ||
                    (i == numalign - 1 && j == 0)
                {
                    continue;
                }
                self.draw_alignment_pattern(alignpatpos[i], alignpatpos[j]);
            }
        }

        // Reserve the format areas; the real bits are written once the mask is known
        self.draw_format_bits(Mask::new(0));
        self.draw_version();
    }

    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let xx: i32 = x + dx;
                let yy: i32 = y + dy;
                if self.in_bounds(xx, yy) {
                    let dist: i32 = dx.abs().max(dy.abs());
                    self.set_function_module(xx, yy, dist != 2 && dist != 4);
                }
            }
        }
    }

    // 5x5: dark ring, light ring, dark centre
    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                self.set_function_module(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    fn draw_format_bits(&mut self, mask: Mask) {
        let bits: u32 = {
            let data = u32::from((self.errorcorrectionlevel.format_bits() << 3) | mask.value());
            let mut rem: u32 = data;
            for _ in 0..10 {
                rem = (rem << 1) ^ ((rem >> 9) * 0x537);
            }
            ((data << 10) | rem) ^ 0x5412
        };

        // First copy, around the top left finder
        for i in 0..6 {
            self.set_function_module(8, i, get_bit(bits, i as u8));
        }
        self.set_function_module(8, 7, get_bit(bits, 6));
        self.set_function_module(8, 8, get_bit(bits, 7));
        self.set_function_module(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function_module(14 - i, 8, get_bit(bits, i as u8));
        }

        // Second copy, split between the other two finders
        let size: i32 = self.size;
        for i in 0..8 {
            self.set_function_module(size - 1 - i, 8, get_bit(bits, i as u8));
        }
        for i in 8..15 {
            self.set_function_module(8, size - 15 + i, get_bit(bits, i as u8));
        }
        self.set_function_module(8, size - 8, true); // Always dark
    }

    fn draw_version(&mut self) {
        let ver = u32::from(self.version.value());
        if ver < 7 {
            return;
        }
        let bits: u32 = {
            let mut rem: u32 = ver;
            for _ in 0..12 {
                rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
            }
            (ver << 12) | rem
        };
        for i in 0u8..18 {
            let bit: bool = get_bit(bits, i);
            let a: i32 = self.size - 11 + i32::from(i % 3);
            let b: i32 = i32::from(i / 3);
            self.set_function_module(a, b, bit);
            self.set_function_module(b, a, bit);
        }
    }

    fn draw_codewords(&mut self, data: &[u8]) {
        assert_eq!(
            data.len(),
            Self::get_num_raw_data_modules(self.version) / 8,
            "Illegal argument"
        );
        let size: i32 = self.size;
        let mut i: usize = 0;
        let mut right: i32 = size - 1;
        while right >= 1 {
            // Skip the vertical timing column
            if right == 6 {
                right = 5;
            }
            for vert in 0..size {
                for j in 0..2 {
                    let x: i32 = right - j;
                    let upward: bool = ((right + 1) & 2) == 0;
                    let y: i32 = if upward { size - 1 - vert } else { vert };
                    let index = self.index(x, y);
                    if !self.isfunction[index] && i < data.len() * 8 {
                        self.modules[index] = get_bit(data[i >> 3].into(), 7 - ((i as u8) & 7));
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, data.len() * 8);
    }

    fn apply_mask(&mut self, mask: Mask) {
        for y in 0..self.size {
            for x in 0..self.size {
                let index = self.index(x, y);
                if self.isfunction[index] {
                    continue;
                }
                let invert: bool = match mask.value() {
                    0 => (x + y) % 2 == 0,
                    1 => y % 2 == 0,
                    2 => x % 3 == 0,
                    3 => (x + y) % 3 == 0,
                    4 => (x / 3 + y / 2) % 2 == 0,
                    5 => ((x * y) % 2) + ((x * y) % 3) == 0,
                    6 => (((x * y) % 2) + ((x * y) % 3)) % 2 == 0,
                    7 => (((x + y) % 2) + ((x * y) % 3)) % 2 == 0,
                    _ => unreachable!(),
                };
                self.modules[index] ^= invert;
            }
        }
    }

    fn add_ecc_and_interleave(data: &[u8], ver: Version, ecl: QrCodeEcc) -> Vec<u8> {
        assert_eq!(data.len(), Self::get_num_data_codewords(ver, ecl));
        let numblocks: usize = Self::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
        let blockecclen: usize = Self::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
        let rawcodewords: usize = Self::get_num_raw_data_modules(ver) / 8;
        let numshortblocks: usize = numblocks - (rawcodewords % numblocks);
        let shortblocklen: usize = rawcodewords / numblocks;

        // Split data into blocks and append ECC to each block
        let rs = ReedSolomonGenerator::new(blockecclen);
        let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(numblocks);
        let mut k: usize = 0;
        for i in 0..numblocks {
            let datlen: usize = shortblocklen - blockecclen + usize::from(i >= numshortblocks);
            let mut dat: Vec<u8> = data[k..k + datlen].to_vec();
            k += datlen;
            let ecc: Vec<u8> = rs.compute_remainder(&dat);
            if i < numshortblocks {
                dat.push(0);
            }
            dat.extend_from_slice(&ecc);
            blocks.push(dat);
        }

        // Interleave (not concatenate) the bytes from every block into a single sequence
        let mut result = Vec::with_capacity(rawcodewords);
        for i in 0..=shortblocklen {
            for (j, block) in blocks.iter().enumerate() {
                // Skip the padding byte in short blocks
                if i != shortblocklen - blockecclen || j >= numshortblocks {
                    result.push(block[i]);
                }
            }
        }
        debug_assert_eq!(result.len(), rawcodewords);
        result
    }

    fn get_alignment_pattern_positions(&self) -> Vec<i32> {
        let ver = i32::from(self.version.value());
        if ver == 1 {
            return Vec::new();
        }
        let numalign: i32 = ver / 7 + 2;
        let step: i32 = if ver == 32 {
            26
        } else {
            ((ver * 4 + numalign * 2 + 1) / (numalign * 2 - 2)) * 2
        };
        let mut result: Vec<i32> = (0..numalign - 1)
            .map(|i| self.size - 7 - i * step)
            .collect();
        result.push(6);
        result.reverse();
        result
    }

    fn get_num_raw_data_modules(ver: Version) -> usize {
        let ver = usize::from(ver.value());
        let mut result: usize = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let numalign: usize = ver / 7 + 2;
            result -= (25 * numalign - 10) * numalign - 55;
            if ver >= 7 {
                result -= 36;
            }
        }
        result
    }

    fn get_num_data_codewords(ver: Version, ecl: QrCodeEcc) -> usize {
        Self::get_num_raw_data_modules(ver) / 8 -
            Self::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl) *
                Self::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl)
    }

    fn char_count_bits(ver: Version) -> u8 {
        if ver.value() <= 9 { 8 } else { 16 }
    }

    fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: QrCodeEcc) -> usize {
        table[ecl.ordinal()][usize::from(ver.value())] as usize
    }
}

struct ReedSolomonGenerator {
    divisor: Vec<u8>,
}

impl ReedSolomonGenerator {
    fn new(degree: usize) -> Self {
        assert!((1..=30).contains(&degree), "Degree out of range");
        // Coefficients from highest to lowest power, excluding the leading 1
        let mut divisor = vec![0u8; degree];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = Self::multiply(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = Self::multiply(root, 0x02);
        }
        Self { divisor }
    }

    fn compute_remainder(&self, data: &[u8]) -> Vec<u8> {
        let mut result = vec![0u8; self.divisor.len()];
        for b in data {
            let factor: u8 = b ^ result[0];
            result.remove(0);
            result.push(0);
            for (x, &y) in result.iter_mut().zip(self.divisor.iter()) {
                *x ^= Self::multiply(y, factor);
            }
        }
        result
    }

    // GF(2^8) product modulo x^8 + x^4 + x^3 + x^2 + 1
    fn multiply(x: u8, y: u8) -> u8 {
        let mut z: u8 = 0;
        for i in (0..8).rev() {
            z = (z << 1) ^ ((z >> 7) * 0x1d);
            z ^= ((y >> i) & 1) * x;
        }
        z
    }
}

struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            currentrunlength += self.qr_size; // Add light border to initial run
        }
        let len: usize = self.run_history.len();
        self.run_history.copy_within(0..len - 1, 1);
        self.run_history[0] = currentrunlength;
    }

    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n) +
            i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size; // Add light border to final run
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

const BYTE_MODE_INDICATOR: u32 = 0x4;

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Error correction level for a QR code.
///
/// On the wire the levels are spelled `"L"`, `"M"`, `"Q"` and `"H"`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    #[serde(rename = "L")]
    Low,
    /// Tolerates ~15% erroneous codewords.
    #[serde(rename = "M")]
    Medium,
    /// Tolerates ~25% erroneous codewords.
    #[serde(rename = "Q")]
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    #[serde(rename = "H")]
    High,
}

impl QrCodeEcc {
    /// Nominal share of codewords that can be restored, in percent.
    pub fn recovery_percent(self) -> u32 {
        use QrCodeEcc::*;
        match self {
            Low => 7,
            Medium => 15,
            Quartile => 25,
            High => 30,
        }
    }

    /// Returns the single-letter name used on the wire.
    pub fn letter(self) -> char {
        use QrCodeEcc::*;
        match self {
            Low => 'L',
            Medium => 'M',
            Quartile => 'Q',
            High => 'H',
        }
    }

    /// Returns an unsigned 2-bit integer (in the range 0 to 3).
    fn ordinal(self) -> usize {
        use QrCodeEcc::*;
        match self {
            Low => 0,
            Medium => 1,
            Quartile => 2,
            High => 3,
        }
    }

    /// Returns an unsigned 2-bit integer (in the range 0 to 3).
    fn format_bits(self) -> u8 {
        use QrCodeEcc::*;
        match self {
            Low => 1,
            Medium => 0,
            Quartile => 3,
            High => 2,
        }
    }
}

impl core::fmt::Display for QrCodeEcc {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            length: 0,
        }
    }

    fn len(&self) -> usize {
        self.length
    }

    fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0);
        for i in (0..len).rev() {
            if self.length % 8 == 0 {
                self.data.push(0);
            }
            let bit: u8 = ((val >> i) as u8) & 1;
            let shift: usize = 7 - (self.length & 7);
            if let Some(last) = self.data.last_mut() {
                *last |= bit << shift;
            }
            self.length += 1;
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Error returned when content cannot be represented as a QR symbol.
///
/// The error correction level is never lowered to make data fit; callers that hit
/// [`EncodingError::DataTooLong`] should shorten the content or pick a lower level themselves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// Nothing to encode.
    #[error("empty content")]
    EmptyContent,
    /// Content exceeds the byte capacity of version 40 at the requested level.
    #[error("content is {len} bytes, the maximum at this error correction level is {max} bytes")]
    DataTooLong { len: usize, max: usize },
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns the side length in modules of a symbol of this version.
    pub const fn size(self) -> i32 {
        (self.0 as i32) * 4 + 17
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }
}

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::decode_matrix;

    const LEVELS: [QrCodeEcc; 4] = [
        QrCodeEcc::Low,
        QrCodeEcc::Medium,
        QrCodeEcc::Quartile,
        QrCodeEcc::High,
    ];

    #[test]
    fn test_empty_content_is_rejected() {
        assert_eq!(QrCode::encode_text("", QrCodeEcc::Low), Err(EncodingError::EmptyContent));
    }

    #[test]
    fn test_known_capacities() {
        assert_eq!(QrCode::byte_capacity(Version::new(1), QrCodeEcc::Low), 17);
        assert_eq!(QrCode::byte_capacity(Version::new(1), QrCodeEcc::Medium), 14);
        assert_eq!(QrCode::byte_capacity(Version::new(1), QrCodeEcc::High), 7);
        assert_eq!(QrCode::byte_capacity(Version::new(10), QrCodeEcc::Medium), 213);
        assert_eq!(QrCode::byte_capacity(Version::MAX, QrCodeEcc::Low), 2953);
        assert_eq!(QrCode::byte_capacity(Version::MAX, QrCodeEcc::High), 1273);
    }

    #[test]
    fn test_capacity_boundary_escalates_version() {
        for ecl in LEVELS {
            let cap = QrCode::byte_capacity(Version::new(3), ecl);
            let exact = "a".repeat(cap);
            let qr = QrCode::encode_text(&exact, ecl).unwrap();
            assert_eq!(qr.version(), Version::new(3));

            assert_eq!(decode_matrix(&qr), exact.into_bytes());

            let over = "a".repeat(cap + 1);
            let qr = QrCode::encode_text(&over, ecl).unwrap();
            assert_eq!(qr.version(), Version::new(4));
            assert_eq!(qr.error_correction_level(), ecl);
            assert_eq!(decode_matrix(&qr), over.into_bytes());
        }
    }

    #[test]
    fn test_capacity_boundary_at_largest_version() {
        let max = QrCode::byte_capacity(Version::MAX, QrCodeEcc::Quartile);
        let qr = QrCode::encode_text(&"z".repeat(max), QrCodeEcc::Quartile).unwrap();
        assert_eq!(qr.version(), Version::MAX);
        assert_eq!(qr.size(), 177);
        assert_eq!(decode_matrix(&qr), "z".repeat(max).into_bytes());

        let err = QrCode::encode_text(&"z".repeat(max + 1), QrCodeEcc::Quartile).unwrap_err();
        assert_eq!(err, EncodingError::DataTooLong { len: max + 1, max });
    }

    #[test]
    fn test_example_url_round_trips() {
        let qr = QrCode::encode_text("https://example.com", QrCodeEcc::Medium).unwrap();
        assert_eq!(qr.version(), Version::new(2));
        assert_eq!(decode_matrix(&qr), b"https://example.com".to_vec());
    }

    #[test]
    fn test_round_trip_all_levels() {
        let samples = [
            "A",
            "Hello, World!",
            "The quick brown fox jumps over the lazy dog 0123456789",
            "caf\u{e9} \u{2713} \u{1f600}",
        ];
        for ecl in LEVELS {
            for text in samples {
                let qr = QrCode::encode_text(text, ecl).unwrap();
                assert_eq!(decode_matrix(&qr), text.as_bytes().to_vec(), "{text:?} at {ecl}");
            }
        }
    }

    #[test]
    fn test_round_trip_with_version_information() {
        // Large enough to need version 7+ and the 16-bit count indicator
        let text = "0123456789abcdef".repeat(20);
        let qr = QrCode::encode_text(&text, QrCodeEcc::Medium).unwrap();
        assert!(qr.version().value() >= 10);
        assert_eq!(decode_matrix(&qr), text.into_bytes());
    }

    #[test]
    fn test_mask_selection_picks_lowest_penalty() {
        for text in ["https://example.com", "mask selection", "0000000000000000"] {
            let auto = QrCode::encode_text(text, QrCodeEcc::Quartile).unwrap();
            let penalties: Vec<i32> = (0u8..8)
                .map(|m| {
                    QrCode::encode_with_mask(text.as_bytes(), QrCodeEcc::Quartile, Some(Mask::new(m)))
                        .unwrap()
                        .penalty_score()
                })
                .collect();
            let min = *penalties.iter().min().unwrap();
            let first_min = penalties.iter().position(|&p| p == min).unwrap();
            assert_eq!(usize::from(auto.mask().value()), first_min, "{text:?}: {penalties:?}");
            assert_eq!(auto.penalty_score(), min);
        }
    }

    #[test]
    fn test_forced_masks_all_decode() {
        for m in 0u8..8 {
            let qr = QrCode::encode_with_mask(b"forced", QrCodeEcc::Low, Some(Mask::new(m))).unwrap();
            assert_eq!(qr.mask(), Mask::new(m));
            assert_eq!(decode_matrix(&qr), b"forced".to_vec());
        }
    }

    fn filler(len: usize) -> String {
        (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
    }

    #[test]
    fn test_full_capacity_symbols_decode() {
        for ecl in LEVELS {
            for v in 1..=25u8 {
                let version = Version::new(v);
                let text = filler(QrCode::byte_capacity(version, ecl));
                let qr = QrCode::encode_text(&text, ecl).unwrap();
                assert_eq!(qr.version(), version);
                assert_eq!(decode_matrix(&qr), text.into_bytes(), "version {v} at {ecl}");
            }
        }
    }

    #[test]
    fn test_alignment_pattern_shape() {
        // Version 2 has a single alignment pattern centred at (18, 18)
        let qr = QrCode::encode_text(&filler(20), QrCodeEcc::Medium).unwrap();
        assert_eq!(qr.version(), Version::new(2));
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let (x, y) = (18 + dx, 18 + dy);
                let ring = dx.abs().max(dy.abs());
                assert!(qr.is_function_module(x, y), "({x}, {y})");
                assert_eq!(qr.get_module(x, y), ring != 1, "({x}, {y})");
            }
        }
        assert!(!qr.is_function_module(15, 18));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = QrCode::encode_text("same input", QrCodeEcc::High).unwrap();
        let b = QrCode::encode_text("same input", QrCodeEcc::High).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_function_modules_marked() {
        let qr = QrCode::encode_text("function", QrCodeEcc::Low).unwrap();
        // Finder corners and timing patterns
        assert!(qr.is_function_module(0, 0));
        assert!(qr.is_function_module(qr.size() - 1, 0));
        assert!(qr.is_function_module(0, qr.size() - 1));
        assert!(qr.is_function_module(10, 6));
        // Bottom-right corner holds data
        assert!(!qr.is_function_module(qr.size() - 1, qr.size() - 1));
        // Dark module next to the lower-left format copy
        assert!(qr.get_module(8, qr.size() - 8));
        assert!(!qr.get_module(-1, 0));
        assert!(!qr.is_function_module(qr.size(), 0));
    }

    #[test]
    fn test_reed_solomon_remainder() {
        // Version 1-M example codewords from the standard's worked example
        let data = [
            0x10, 0x20, 0x0c, 0x56, 0x61, 0x80, 0xec, 0x11, 0xec, 0x11, 0xec, 0x11, 0xec, 0x11,
            0xec, 0x11,
        ];
        let ecc = ReedSolomonGenerator::new(10).compute_remainder(&data);
        assert_eq!(ecc, vec![0xa5, 0x24, 0xd4, 0xc1, 0xed, 0x36, 0xc7, 0x87, 0x2c, 0x55]);
    }

    #[test]
    fn test_ecc_letters() {
        let letters: String = LEVELS.iter().map(|l| l.letter()).collect();
        assert_eq!(letters, "LMQH");
        assert_eq!(serde_json::to_string(&QrCodeEcc::Quartile).unwrap(), "\"Q\"");
        assert_eq!(serde_json::from_str::<QrCodeEcc>("\"H\"").unwrap(), QrCodeEcc::High);
    }
}
