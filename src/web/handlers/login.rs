//! Login page template.

use askama::Template;
use askama_web::WebTemplate;

/// Template for the login page.
///
/// Renders `templates/passport/login.html` with:
/// - Site title
/// - Anti-forgery token for the form
/// - Redirect target carried through the login
///
/// The page script encrypts the password with the key from the `PublicKey`
/// cookie before posting.
#[derive(Template, WebTemplate)]
#[template(path = "passport/login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub xsrf_token: String,
    pub from: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_form_fields() {
        let page = LoginTemplate {
            title: "My Blog".to_string(),
            xsrf_token: "tok123".to_string(),
            from: "/admin".to_string(),
        }
        .render()
        .unwrap();

        assert!(page.contains("My Blog"));
        assert!(page.contains(r#"name="__RequestVerificationToken" value="tok123""#));
        assert!(page.contains("/passport/validatecode"));
    }

    #[test]
    fn test_escapes_title() {
        let page = LoginTemplate {
            title: "<script>".to_string(),
            xsrf_token: String::new(),
            from: String::new(),
        }
        .render()
        .unwrap();

        assert!(!page.contains("<h1><script></h1>"));
        assert!(page.contains("&#60;script&#62;") || page.contains("&lt;script&gt;"));
    }
}
