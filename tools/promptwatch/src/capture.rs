use crate::prompt_detector::detects;

/// Suffix of `output` holding at most `max_bytes` bytes, starting on a line
/// boundary. A line cut by the limit is dropped rather than scanned in part.
pub fn tail_window(output: &str, max_bytes: usize) -> &str {
    if output.len() <= max_bytes {
        return output;
    }

    let mut start = output.len() - max_bytes;
    while !output.is_char_boundary(start) {
        start += 1;
    }

    let window = &output[start..];
    if output[..start].ends_with('\n') {
        return window;
    }
    match window.find('\n') {
        Some(pos) => &window[pos + 1..],
        None => "",
    }
}

pub fn detects_in_tail(output: &str, max_bytes: usize) -> bool {
    detects(tail_window(output, max_bytes))
}

#[cfg(test)]
mod tests {
    use super::{detects_in_tail, tail_window};

    #[test]
    fn short_output_is_returned_whole() {
        assert_eq!(tail_window("abc\n──╯", 64), "abc\n──╯");
        assert_eq!(tail_window("", 8), "");
    }

    #[test]
    fn cut_line_is_dropped() {
        let output = "first line\nsecond\nthird";
        assert_eq!(tail_window(output, 10), "third");
    }

    #[test]
    fn cut_on_line_start_keeps_that_line() {
        let output = "aaaa\nbbbb\ncccc";
        assert_eq!(tail_window(output, 9), "bbbb\ncccc");
    }

    #[test]
    fn never_splits_a_glyph() {
        // each box glyph is three bytes
        let output = "x\n╰──╯";
        for max in 0..output.len() {
            let window = tail_window(output, max);
            assert!(output.ends_with(window));
        }
    }

    #[test]
    fn window_without_line_break_is_empty() {
        assert_eq!(tail_window("╰──────╯", 6), "");
    }

    #[test]
    fn border_outside_the_window_is_ignored() {
        let output = "╰───╯\nstatus line\n";
        assert!(!detects_in_tail(output, 12));
        assert!(detects_in_tail(output, output.len()));

        let with_border = "noise noise noise\n╰────╯\n";
        assert!(detects_in_tail(with_border, 20));
    }
}
