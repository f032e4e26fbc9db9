//! HTML rendering for the upload page and the diagnosis result

use plant_diagnosis::pipeline::{DiagnosisReport, MessageKind};
use plant_diagnosis::utils::{escape_html, format_percent};
use plant_diagnosis::Language;

const BACKGROUND_IMAGE_URL: &str =
    "https://static.toiimg.com/photo/resizemode-75,overlay-toiplus,msid-83832321/83832321.jpg";

const STYLE: &str = r#"
body {
    background-size: cover;
    background-position: center;
    background-repeat: no-repeat;
    background-attachment: fixed;
    color: #ffffff;
    font-family: sans-serif;
    margin: 0;
}
main {
    max-width: 760px;
    margin: 0 auto;
    padding: 2rem 1rem;
}
form, .result, .error {
    background-color: rgba(0, 0, 0, 0.5);
    border-radius: 8px;
    padding: 1rem 1.5rem;
    margin-bottom: 1.5rem;
}
select, input, button {
    background-color: rgba(0, 0, 0, 0.5);
    color: #ffffff;
    border: 1px solid #ffffff;
    padding: 0.4rem;
    margin: 0.3rem 0 0.8rem 0;
}
a { color: #9be79b; }
img.upload { max-width: 100%; border-radius: 4px; }
.error { color: #ff8080; }
.warning { color: #ffd27f; }
"#;

/// Full page: title, upload form and an optional result section
pub fn render_page(selected: Language, result: Option<&str>) -> String {
    let mut options = String::new();
    for language in Language::ALL {
        let selected_attr = if language == selected { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            language.code(),
            selected_attr,
            language.display_name()
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Plant Disease Detection</title>
<style>{style}body {{ background-image: url("{background}"); }}</style>
</head>
<body>
<main>
<h1>Plant Disease Detection</h1>
<p>Upload an image of the plant leaf</p>
<form action="/predict" method="post" enctype="multipart/form-data">
<label for="language">Select Language:</label><br>
<select id="language" name="language">{options}</select><br>
<label for="image">Choose an image...</label><br>
<input id="image" type="file" name="image" accept="image/*"><br>
<button type="submit">Predict Disease</button>
</form>
{result}
</main>
</body>
</html>
"#,
        style = STYLE,
        background = BACKGROUND_IMAGE_URL,
        options = options,
        result = result.unwrap_or_default(),
    )
}

/// Inline error block
pub fn render_error(message: &str) -> String {
    format!("<div class=\"error\">{}</div>", escape_html(message))
}

/// Result section for one diagnosis
pub fn render_report(report: &DiagnosisReport, image_data_uri: Option<&str>) -> String {
    let mut html = String::from("<section class=\"result\">\n");

    if let Some(uri) = image_data_uri {
        html.push_str(&format!(
            "<img class=\"upload\" src=\"{}\" alt=\"Uploaded leaf\">\n",
            escape_html(uri)
        ));
    }

    html.push_str(&format!("<h1>{}</h1>\n", escape_html(report.title())));
    html.push_str(&format!(
        "<p>Prediction: {} ({})</p>\n",
        escape_html(report.prediction.label.as_str()),
        format_percent(report.prediction.confidence)
    ));
    if report.prediction.low_confidence {
        html.push_str(
            "<p class=\"warning\">Low confidence: consider uploading a clearer photo of a single leaf.</p>\n",
        );
    }

    for block in &report.messages {
        let text = escape_html(&block.display_text());
        let class = if block.translated().is_some() { "message" } else { "error" };
        match block.kind {
            MessageKind::Status => {
                html.push_str(&format!(
                    "<p class=\"{}\">{} {}</p>\n",
                    class,
                    block.kind.heading(),
                    text
                ));
            }
            _ => {
                html.push_str(&format!("<h3>{}</h3>\n", block.kind.heading()));
                html.push_str(&format!("<p class=\"{}\">{}</p>\n", class, text));
            }
        }
    }

    if let Some(link) = &report.diagnosis.reference {
        html.push_str(&format!(
            "<p><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></p>\n",
            escape_html(&link.url),
            escape_html(&link.text)
        ));
    }

    html.push_str("</section>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_has_form_and_all_languages() {
        let page = render_page(Language::Tamil, None);
        assert!(page.contains("<title>Plant Disease Detection</title>"));
        assert!(page.contains("Upload an image of the plant leaf"));
        assert!(page.contains("Predict Disease"));
        assert!(page.contains("<option value=\"ta\" selected>Tamil</option>"));
        for language in Language::ALL {
            assert!(page.contains(language.display_name()));
        }
    }

    #[test]
    fn test_error_is_escaped() {
        assert_eq!(
            render_error("<b>bad</b>"),
            "<div class=\"error\">&lt;b&gt;bad&lt;/b&gt;</div>"
        );
    }
}
