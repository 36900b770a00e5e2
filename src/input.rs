use std::io::{self, BufRead, Write};

/// Asks for the search url on `output` and reads one line from `input`.
/// Returns `None` when nothing usable was entered.
pub fn prompt_search_url<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Option<String>> {
    write!(output, "Enter search URL: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(non_empty(&line))
}

/// Trims the raw input and makes it absolute against `base_url`. Blank
/// input is `None`; reporting it is left to the caller.
pub fn normalize_search_url(raw: &str, base_url: &str) -> Option<String> {
    let url = non_empty(raw)?;

    if url.starts_with("http") {
        Some(url)
    } else {
        Some(format!("{}{}", base_url.trim_end_matches('/'), url))
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prompt_reads_and_trims_one_line() {
        let mut input = Cursor::new("  /dentiste/paris  \nignored\n");
        let mut output = Vec::new();

        let url = prompt_search_url(&mut input, &mut output).unwrap();
        assert_eq!(url.as_deref(), Some("/dentiste/paris"));
        assert_eq!(String::from_utf8(output).unwrap(), "Enter search URL: ");
    }

    #[test]
    fn blank_or_missing_input_is_none() {
        let mut output = Vec::new();
        assert_eq!(prompt_search_url(&mut Cursor::new("   \n"), &mut output).unwrap(), None);
        assert_eq!(prompt_search_url(&mut Cursor::new(""), &mut output).unwrap(), None);
    }

    #[test]
    fn relative_paths_get_the_base_host() {
        assert_eq!(
            normalize_search_url("/dentiste/paris", "https://www.doctolib.fr/").as_deref(),
            Some("https://www.doctolib.fr/dentiste/paris")
        );
        assert_eq!(
            normalize_search_url(" https://www.doctolib.fr/x ", "https://www.doctolib.fr").as_deref(),
            Some("https://www.doctolib.fr/x")
        );
        assert_eq!(normalize_search_url("  ", "https://www.doctolib.fr"), None);
    }
}
