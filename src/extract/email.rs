use mail_parser::MessageParser;

use super::{ExtractError, ExtractedText};

/// Extract text from an email message.
///
/// The subject, sender, and date headers are prepended to the body so the
/// retrieval context keeps them. HTML-only messages fall back to a
/// tag-stripped rendering of the HTML part.
pub(super) fn extract(bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
    let message = MessageParser::default()
        .parse(bytes)
        .ok_or(ExtractError::Email)?;

    let mut text = String::new();
    if let Some(subject) = message.subject() {
        text.push_str("Subject: ");
        text.push_str(subject);
        text.push('\n');
    }
    if let Some(sender) = message.from().and_then(|list| list.first()) {
        let line = match (sender.name(), sender.address()) {
            (Some(name), Some(address)) => format!("{name} <{address}>"),
            (Some(name), None) => name.to_string(),
            (None, Some(address)) => address.to_string(),
            (None, None) => String::new(),
        };
        if !line.is_empty() {
            text.push_str("From: ");
            text.push_str(&line);
            text.push('\n');
        }
    }
    if let Some(date) = message.date() {
        text.push_str("Date: ");
        text.push_str(&date.to_rfc3339());
        text.push('\n');
    }

    let body = message
        .body_text(0)
        .map(|body| body.trim().to_string())
        .or_else(|| message.body_html(0).map(|html| strip_html(&html)))
        .unwrap_or_default();
    if !body.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&body);
    }

    tracing::debug!(
        has_subject = message.subject().is_some(),
        body_characters = body.chars().count(),
        "Extracted email text"
    );
    Ok(ExtractedText {
        text,
        page_count: None,
    })
}

fn strip_html(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN_EMAIL: &str = "From: Jane Adjuster <jane@example.com>\r\n\
         To: claims@example.com\r\n\
         Subject: Claim 1042 status\r\n\
         Date: Tue, 2 Jul 2024 10:00:00 +0000\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         The claim was approved pending the deductible.\r\n";

    #[test]
    fn prepends_headers_to_the_body() {
        let extracted = extract(PLAIN_EMAIL.as_bytes()).unwrap();
        assert!(extracted.text.starts_with("Subject: Claim 1042 status\n"));
        assert!(extracted.text.contains("From: Jane Adjuster <jane@example.com>"));
        assert!(extracted.text.contains("Date: 2024-07-02"));
        assert!(
            extracted
                .text
                .ends_with("The claim was approved pending the deductible.")
        );
        assert_eq!(extracted.page_count, None);
    }

    #[test]
    fn falls_back_to_stripped_html_bodies() {
        let raw = "From: a@example.com\r\n\
             Subject: HTML only\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             \r\n\
             <html><body><p>Coverage is <b>excluded</b>.</p></body></html>\r\n";
        let extracted = extract(raw.as_bytes()).unwrap();
        assert!(extracted.text.contains("Coverage is excluded."));
        assert!(!extracted.text.contains('<'));
    }

    #[test]
    fn strip_html_drops_tags_only() {
        assert_eq!(strip_html("<p>a <b>b</b></p>"), "a b");
    }
}
