/// Sanitises user-authored post bodies before they are stored.
///
/// Safe formatting tags (`<b>`, `<p>`, links) survive; `<script>`, `<iframe>`
/// and event-handler attributes are stripped along with their content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_keeps_formatting() {
        let cleaned = clean_html("<p>hi <b>there</b><script>alert(1)</script></p>");
        assert_eq!(cleaned, "<p>hi <b>there</b></p>");
    }

    #[test]
    fn strips_event_handlers() {
        let cleaned = clean_html(r#"<b onclick="steal()">x</b>"#);
        assert_eq!(cleaned, "<b>x</b>");
    }
}
