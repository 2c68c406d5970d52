//! Canonical Scripture book numbering.
//!
//! Book codes are the fixed three-character USFM identifiers. The canonical
//! range is `1..=LAST_BOOK` (Genesis through Revelation); codes past the end
//! of that range (deuterocanon, peripheral material) are recognized but not
//! canonical, which is what lets [`book_number`] + a range check act as the
//! "is this a Scripture book?" filter.

/// Highest canonical book number (Revelation).
pub const LAST_BOOK: u32 = 66;

/// All recognized book codes in canonical order. Index + 1 is the book
/// number. Entries past `LAST_BOOK` are deuterocanonical and peripheral
/// material, deliberately outside the canonical range.
pub const BOOK_CODES: &[&str] = &[
    // Old Testament
    "GEN", "EXO", "LEV", "NUM", "DEU", "JOS", "JDG", "RUT", "1SA", "2SA", //
    "1KI", "2KI", "1CH", "2CH", "EZR", "NEH", "EST", "JOB", "PSA", "PRO", //
    "ECC", "SNG", "ISA", "JER", "LAM", "EZK", "DAN", "HOS", "JOL", "AMO", //
    "OBA", "JON", "MIC", "NAM", "HAB", "ZEP", "HAG", "ZEC", "MAL", //
    // New Testament
    "MAT", "MRK", "LUK", "JHN", "ACT", "ROM", "1CO", "2CO", "GAL", "EPH", //
    "PHP", "COL", "1TH", "2TH", "1TI", "2TI", "TIT", "PHM", "HEB", "JAS", //
    "1PE", "2PE", "1JN", "2JN", "3JN", "JUD", "REV", //
    // Deuterocanon
    "TOB", "JDT", "ESG", "WIS", "SIR", "BAR", "LJE", "S3Y", "SUS", "BEL", //
    "1MA", "2MA", "3MA", "4MA", "1ES", "2ES", "MAN", "PS2", "ODA", "PSS", //
    // Peripheral and extra material
    "XXA", "XXB", "XXC", "XXD", "XXE", "XXF", "XXG", //
    "FRT", "BAK", "OTH", "INT", "CNC", "GLO", "TDX", "NDX",
];

/// 1-based book number for a code, or `None` when the code is unrecognized.
///
/// Codes are case-sensitive; metadata files carry them uppercase.
pub fn book_number(code: &str) -> Option<u32> {
    BOOK_CODES
        .iter()
        .position(|&c| c == code)
        .map(|i| i as u32 + 1)
}

/// Book code for a 1-based number, or `None` when out of table range.
pub fn book_code(number: u32) -> Option<&'static str> {
    if number == 0 {
        return None;
    }
    BOOK_CODES.get(number as usize - 1).copied()
}

/// Whether a code names a book inside the canonical range.
pub fn is_canonical(code: &str) -> bool {
    matches!(book_number(code), Some(n) if (1..=LAST_BOOK).contains(&n))
}
