use std::io::{self, BufRead, Write};

/// Prints `question` and reads one line from stdin. EOF reads as an empty answer.
pub fn ask(question: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{question}")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Parses a 1-based menu choice. Anything else means "cancel".
pub fn pick(answer: &str, len: usize) -> Option<usize> {
    match answer.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_bounds() {
        assert_eq!(pick("1", 3), Some(0));
        assert_eq!(pick(" 3 ", 3), Some(2));
        assert_eq!(pick("0", 3), None);
        assert_eq!(pick("4", 3), None);
        assert_eq!(pick("", 3), None);
        assert_eq!(pick("two", 3), None);
    }
}
