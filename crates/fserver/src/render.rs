//! HTML pages for the `show` action.
//!
//! Pages are plain markup with no styling: an index of collections, one
//! list page per collection, and one page per record.

use fserver_store::query::match_string;
use fserver_store::Collection;
use serde_json::Value;
use std::fmt::Write as _;

/// Page names that list a whole collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPage {
    Tests,
    Requests,
    Runs,
    Boards,
    BinaryPackages,
}

impl ListPage {
    pub const ALL: [ListPage; 5] = [
        ListPage::Tests,
        ListPage::Requests,
        ListPage::Runs,
        ListPage::Boards,
        ListPage::BinaryPackages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ListPage::Tests => "Tests",
            ListPage::Requests => "Requests",
            ListPage::Runs => "Runs",
            ListPage::Boards => "Boards",
            ListPage::BinaryPackages => "BinaryPackages",
        }
    }

    pub fn parse(page: &str) -> Option<Self> {
        ListPage::ALL.iter().copied().find(|p| p.name() == page)
    }

    pub fn collection(&self) -> Collection {
        match self {
            ListPage::Tests => Collection::Tests,
            ListPage::Requests => Collection::Requests,
            ListPage::Runs => Collection::Runs,
            ListPage::Boards => Collection::Boards,
            ListPage::BinaryPackages => Collection::BinaryPackages,
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            ListPage::Tests => "test",
            ListPage::Requests => "request",
            ListPage::Runs => "run",
            ListPage::Boards => "board",
            ListPage::BinaryPackages => "binary package",
        }
    }
}

/// How the fields of one record kind are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLayout {
    /// Long text rendered under its own heading
    pub section_fields: &'static [&'static str],
    /// Rendered as bullet lists
    pub list_fields: &'static [&'static str],
}

pub const REQUEST_LAYOUT: ItemLayout = ItemLayout {
    section_fields: &[],
    list_fields: &[],
};

pub const RUN_LAYOUT: ItemLayout = ItemLayout {
    section_fields: &["description"],
    list_fields: &["files"],
};

pub const TEST_LAYOUT: ItemLayout = ItemLayout {
    section_fields: &["description"],
    list_fields: &["tags", "data_files"],
};

pub const PLAIN_LAYOUT: ItemLayout = ItemLayout {
    section_fields: &[],
    list_fields: &[],
};

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Builds pages with links rooted at the action endpoint.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    url_base: String,
}

impl PageRenderer {
    pub fn new(url_base: &str) -> Self {
        Self {
            url_base: url_base.trim_end_matches('/').to_string(),
        }
    }

    fn page_url(&self, page: &str) -> String {
        format!("{}/{}", self.url_base, page)
    }

    fn link(&self, page: &str) -> String {
        format!(
            "<a href=\"{}\">{}</a>",
            escape(&self.page_url(page)),
            escape(page)
        )
    }

    /// Wrap a body in the common page frame.
    pub fn page(&self, title: &str, body: &str) -> String {
        let title = escape(title);
        format!(
            "<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}<hr>\n<a href=\"{home}\">Back to home page</a>\n</body>\n</html>\n",
            title = title,
            body = body,
            home = escape(&self.url_base),
        )
    }

    /// Links to every list page.
    pub fn index_links(&self) -> String {
        let mut html = String::from("<h2>Links to object lists</h2>\n<ul>\n");
        for page in ListPage::ALL {
            let _ = writeln!(html, "<li>{}</li>", self.link(page.name()));
        }
        html.push_str("</ul>\n");
        html
    }

    pub fn index(&self) -> String {
        self.page("Fuego server", &self.index_links())
    }

    /// A sorted list of record file names, each linking to its own page.
    pub fn list(&self, page: ListPage, mut items: Vec<String>) -> String {
        items.sort();
        let mut body = String::new();
        if items.is_empty() {
            let _ = writeln!(body, "<p>No {} records found.</p>", page.noun());
        } else {
            body.push_str("<ul>\n");
            for item in &items {
                let _ = writeln!(body, "<li>{}</li>", self.link(item));
            }
            body.push_str("</ul>\n");
        }
        body.push_str(&self.index_links());
        self.page(&format!("List of {}", page.name()), &body)
    }

    /// One record. Keys are sorted; section and list fields follow `layout`.
    pub fn item(&self, title: &str, record: &Value, layout: ItemLayout) -> String {
        let body = match record.as_object() {
            Some(fields) => render_fields(fields.iter(), layout),
            None => format!("<pre>{}</pre>\n", escape(&match_string(record))),
        };
        self.page(title, &body)
    }

    /// Error banner followed by the index, for `show` failures.
    pub fn error(&self, message: &str) -> String {
        let body = format!(
            "<font color=red>{}</font>\n{}",
            escape(message),
            self.index_links()
        );
        self.page("Error", &body)
    }
}

fn render_fields<'a>(
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
    layout: ItemLayout,
) -> String {
    let mut sorted: Vec<_> = fields.collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut html = String::new();
    let mut in_table = false;
    for (key, value) in sorted {
        let is_section = layout.section_fields.contains(&key.as_str());
        let is_list = layout.list_fields.contains(&key.as_str());
        if (is_section || is_list) && in_table {
            html.push_str("</dl>\n");
            in_table = false;
        }

        if is_section {
            let _ = writeln!(
                html,
                "<h2>{}</h2>\n<p>{}</p>",
                escape(key),
                escape(&match_string(value))
            );
        } else if is_list {
            let _ = writeln!(html, "<h2>{}</h2>\n<ul>", escape(key));
            match value {
                Value::Array(items) => {
                    for item in items {
                        let _ = writeln!(html, "<li>{}</li>", escape(&match_string(item)));
                    }
                }
                Value::Null => {}
                other => {
                    let _ = writeln!(html, "<li>{}</li>", escape(&match_string(other)));
                }
            }
            html.push_str("</ul>\n");
        } else {
            if !in_table {
                html.push_str("<dl>\n");
                in_table = true;
            }
            let _ = writeln!(
                html,
                "<dt>{}</dt><dd>{}</dd>",
                escape(key),
                escape(&match_string(value))
            );
        }
    }
    if in_table {
        html.push_str("</dl>\n");
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_list_page_names() {
        for page in ListPage::ALL {
            assert_eq!(ListPage::parse(page.name()), Some(page));
        }
        assert_eq!(ListPage::parse("tests"), None);
        assert_eq!(ListPage::BinaryPackages.collection(), Collection::BinaryPackages);
    }

    #[test]
    fn test_list_is_sorted_and_linked() {
        let renderer = PageRenderer::new("/cgi-bin/fserver/");
        let html = renderer.list(
            ListPage::Boards,
            vec!["b:2.json".to_string(), "a:1.json".to_string()],
        );
        let a = html.find("a:1.json").unwrap();
        let b = html.find("b:2.json").unwrap();
        assert!(a < b);
        assert!(html.contains("<a href=\"/cgi-bin/fserver/a:1.json\">a:1.json</a>"));
        assert!(html.contains("<h1>List of Boards</h1>"));
        assert!(html.contains("Back to home page"));
    }

    #[test]
    fn test_empty_list() {
        let renderer = PageRenderer::new("/f");
        let html = renderer.list(ListPage::Runs, Vec::new());
        assert!(html.contains("No run records found."));
    }

    #[test]
    fn test_item_layout() {
        let renderer = PageRenderer::new("/f");
        let record = json!({
            "name": "mytest",
            "description": "Checks <things>",
            "tags": ["net", "smoke"],
            "version": 1,
        });
        let html = renderer.item("mytest-1.0-1.yaml", &record, TEST_LAYOUT);

        assert!(html.contains("<h2>description</h2>\n<p>Checks &lt;things&gt;</p>"));
        assert!(html.contains("<h2>tags</h2>\n<ul>\n<li>net</li>\n<li>smoke</li>\n</ul>"));
        assert!(html.contains("<dt>name</dt><dd>mytest</dd>"));
        assert!(html.contains("<dt>version</dt><dd>1</dd>"));
        // sorted: description < name < tags < version
        let positions: Vec<usize> = ["description", "name", "tags", "version"]
            .iter()
            .map(|k| html.find(&format!(">{}<", k)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_request_layout_has_no_sections() {
        let renderer = PageRenderer::new("/f");
        let record = json!({"description": "x", "state": "pending"});
        let html = renderer.item("request", &record, REQUEST_LAYOUT);
        assert!(html.contains("<dt>description</dt><dd>x</dd>"));
        assert!(!html.contains("<h2>"));
    }

    #[test]
    fn test_error_page() {
        let renderer = PageRenderer::new("/f");
        let html = renderer.error("No such page <x>");
        assert!(html.contains("<font color=red>No such page &lt;x&gt;</font>"));
        assert!(html.contains("<a href=\"/f/Tests\">Tests</a>"));
    }
}
