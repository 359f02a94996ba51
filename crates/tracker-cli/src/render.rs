//! HTML statistics page

use coverage_tracker::CoverageEvent;

/// Route the stylesheet is served from
pub const STYLE_SHEET_ROUTE: &str = "/style.css";

/// Render every event as one row of the statistics table
#[must_use]
pub fn render_stats_html(events: &[CoverageEvent]) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Stats</title>
    <link href="{STYLE_SHEET_ROUTE}" rel="stylesheet" type="text/css"/>
</head>
<body>
<table summary="Test Statistics">
    <caption>Test Statistics</caption>
    <tr>
"#
    ));

    for label in CoverageEvent::field_labels() {
        html.push_str(&format!("        <th>{label}</th>\n"));
    }
    html.push_str("    </tr>\n");

    for event in events {
        html.push_str("    <tr>\n");
        for value in event.fields() {
            html.push_str(&format!("        <td>{}</td>\n", escape_html(&value)));
        }
        html.push_str("    </tr>\n");
    }

    html.push_str(
        r#"</table>
</body>
</html>
"#,
    );

    html
}

/// Escape HTML special characters
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage_tracker::Payload;

    #[test]
    fn test_empty_table_has_header_only() {
        let html = render_stats_html(&[]);
        assert!(html.contains("<caption>Test Statistics</caption>"));
        assert!(html.contains("<th>VentureConfigId</th>"));
        assert!(!html.contains("<td>"));
    }

    #[test]
    fn test_rows_follow_field_order() {
        let event = CoverageEvent::synthesized("TrackTestCoverageEvent")
            .with_culture("en_EN")
            .with_payload(Payload::new("tracker", 63.3));
        let html = render_stats_html(&[event.clone(), event]);
        assert_eq!(html.matches("<td>TrackTestCoverageEvent</td>").count(), 2);
        assert!(html.contains("<td>tracker 63.3%</td>"));
        let event_pos = html.find("<td>TrackTestCoverageEvent</td>").unwrap_or(0);
        let culture_pos = html.find("<td>en_EN</td>").unwrap_or(0);
        assert!(event_pos < culture_pos);
    }

    #[test]
    fn test_values_are_escaped() {
        let event = CoverageEvent::synthesized("<script>alert('x')</script>")
            .with_payload(Payload::new("a&b", 1.0));
        let html = render_stats_html(&[event]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("a&amp;b 1%"));
    }

    #[test]
    fn test_links_stylesheet() {
        assert!(render_stats_html(&[]).contains(r#"href="/style.css""#));
    }
}
