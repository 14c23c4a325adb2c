//! Read-only view over one `<table>` fragment of a ballot page.

use scraper::{ElementRef, Html};

/// One structural table of a page, with its position in document order.
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    pub index: usize,
    element: ElementRef<'a>,
}

impl<'a> Table<'a> {
    pub fn new(index: usize, element: ElementRef<'a>) -> Self {
        Self { index, element }
    }

    /// Class list of the table element itself.
    pub fn classes(&self) -> Vec<&'a str> {
        self.element.value().classes().collect()
    }

    /// Whether the class attribute is exactly this single class.
    pub fn is_class(&self, class: &str) -> bool {
        self.classes() == [class]
    }

    /// Whether the table carries no class attribute at all.
    pub fn has_no_class(&self) -> bool {
        self.element.value().attr("class").is_none()
    }

    /// Descendant elements carrying the class, in document order.
    pub fn find_elements(&self, class: &str) -> Vec<ElementRef<'a>> {
        self.element
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().classes().any(|c| c == class))
            .collect()
    }

    /// Descendant elements with this tag and class, in document order.
    pub fn find_tagged(&self, tag: &str, class: &str) -> Vec<ElementRef<'a>> {
        self.find_elements(class)
            .into_iter()
            .filter(|e| e.value().name() == tag)
            .collect()
    }

    /// Raw text of the first descendant carrying the class.
    pub fn find_text(&self, class: &str) -> Option<String> {
        self.find_elements(class).first().map(element_text)
    }

    /// Raw text of every descendant carrying the class.
    pub fn find_all_text(&self, class: &str) -> Vec<String> {
        self.find_elements(class).iter().map(element_text).collect()
    }

    /// Markup of the whole table, for diagnostics.
    pub fn html(&self) -> String {
        self.element.html()
    }
}

/// Concatenated text content of an element.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

/// Nearest enclosing table row of an element.
pub fn enclosing_row<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "tr")
}

/// Every table of a document in document order, nested tables included.
pub fn page_tables(document: &Html) -> Vec<Table<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "table")
        .enumerate()
        .map(|(index, element)| Table::new(index, element))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <table class="primaryTable"><tr><td class="partyHeading">Republican Primary</td></tr></table>
          <table><tr><td class="section">Proposals</td></tr></table>
          <table class="tblOffice extra">
            <tr><td class="office">Governor</td></tr>
            <tr><td class="term">4 Year Term</td></tr>
            <tr><td class="candidate">Jane Doe</td><td class="party">Republican</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_page_tables_in_order() {
        let document = Html::parse_document(PAGE);
        let tables = page_tables(&document);
        assert_eq!(tables.len(), 3);
        assert!(tables[0].is_class("primaryTable"));
        assert!(tables[1].has_no_class());
        let mut classes = tables[2].classes();
        classes.sort_unstable();
        assert_eq!(classes, vec!["extra", "tblOffice"]);
        assert!(!tables[2].is_class("tblOffice"));
    }

    #[test]
    fn test_find_text() {
        let document = Html::parse_document(PAGE);
        let tables = page_tables(&document);
        assert_eq!(
            tables[0].find_text("partyHeading").as_deref(),
            Some("Republican Primary")
        );
        assert_eq!(tables[0].find_text("office"), None);
        assert_eq!(tables[2].find_all_text("term"), vec!["4 Year Term"]);
    }

    #[test]
    fn test_enclosing_row() {
        let document = Html::parse_document(PAGE);
        let tables = page_tables(&document);
        let candidate = tables[2].find_elements("candidate")[0];
        let row = enclosing_row(&candidate).unwrap();
        let party: String = row
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().classes().any(|c| c == "party"))
            .map(|e| element_text(&e))
            .collect();
        assert_eq!(party, "Republican");
    }
}
