//! Low-level line helpers shared by the record and FASTA readers.

use memchr::{memchr, memchr_iter};

/// Fast u64 parsing without allocation.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Split a line on a single-byte delimiter.
#[inline]
pub fn split_fields(line: &str, delimiter: u8) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(12);
    let mut begin = 0;
    for pos in memchr_iter(delimiter, bytes) {
        fields.push(&line[begin..pos]);
        begin = pos + 1;
    }
    fields.push(&line[begin..]);
    fields
}

/// Strip a trailing `\n` or `\r\n`.
#[inline]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = match memchr(b'\n', line) {
        Some(pos) => &line[..pos],
        None => line,
    };
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Check if a line carries no data (blank, comment, or UCSC header).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
        || line[0] == b'#'
        || line.starts_with(b"track")
        || line.starts_with(b"browser")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64_fast() {
        assert_eq!(parse_u64_fast(b"12345"), Some(12345));
        assert_eq!(parse_u64_fast(b"0"), Some(0));
        assert_eq!(parse_u64_fast(b""), None);
        assert_eq!(parse_u64_fast(b"abc"), None);
        assert_eq!(parse_u64_fast(b"-5"), None);
        assert_eq!(parse_u64_fast(b"18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_u64_fast(b"18446744073709551616"), None);
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("chr1\t100\t200", b'\t'), vec!["chr1", "100", "200"]);
        assert_eq!(split_fields("a,,b", b','), vec!["a", "", "b"]);
        assert_eq!(split_fields("single", b'\t'), vec!["single"]);
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end(b"ACGT\r\n"), b"ACGT");
        assert_eq!(trim_line_end(b"ACGT\n"), b"ACGT");
        assert_eq!(trim_line_end(b"ACGT"), b"ACGT");
    }

    #[test]
    fn test_should_skip_line() {
        assert!(should_skip_line(b""));
        assert!(should_skip_line(b"   "));
        assert!(should_skip_line(b"#comment"));
        assert!(should_skip_line(b"track name=foo"));
        assert!(should_skip_line(b"browser position chr1:1-100"));
        assert!(!should_skip_line(b"chr1\t100\t200"));
    }
}
