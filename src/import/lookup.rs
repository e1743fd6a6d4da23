//! Cascading element lookups over a metadata tree
//!
//! Archives disagree on namespaces and on a few element names, so every
//! lookup runs an ordered list of strategies and keeps the first hit.

use super::xml::XmlElement;

/// Logical scalar fields read from metadata elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Type,
    Nullable,
    Folder,
    Query,
    Description,
    ReferencedSchema,
    ReferencedTable,
    Column,
    Referenced,
}

impl Field {
    /// Primary local name of the field's element
    pub fn local_name(self) -> &'static str {
        match self {
            Field::Name => "n",
            Field::Type => "type",
            Field::Nullable => "nullable",
            Field::Folder => "folder",
            Field::Query => "query",
            Field::Description => "description",
            Field::ReferencedSchema => "referencedSchema",
            Field::ReferencedTable => "referencedTable",
            Field::Column => "column",
            Field::Referenced => "referenced",
        }
    }

    /// Alternative local names accepted for the field
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Name => &["name"],
            Field::Query => &["queryOriginal"],
            Field::Referenced => &["referencedColumn"],
            _ => &[],
        }
    }
}

/// Lookup scope: the document's default namespace, if any
#[derive(Debug, Clone, Copy, Default)]
pub struct Lookup<'a> {
    namespace: Option<&'a str>,
}

type TextStrategy = for<'e> fn(&'e XmlElement, Field, Option<&str>) -> Option<&'e str>;
type SetStrategy = for<'e> fn(&'e XmlElement, &str, Option<&str>) -> Vec<&'e XmlElement>;

const TEXT_STRATEGIES: &[(&str, TextStrategy)] = &[
    ("qualified", qualified_child),
    ("unqualified", unqualified_child),
    ("wildcard", wildcard_child),
    ("alias", alias_child),
    ("direct", direct_child),
];

const SET_STRATEGIES: &[(&str, SetStrategy)] = &[
    ("qualified", qualified_descendants),
    ("unqualified", unqualified_descendants),
    ("wildcard", wildcard_descendants),
];

/// Try each strategy in order and return the first non-`None` result
pub fn first_success<S, T>(
    strategies: &[S],
    mut attempt: impl FnMut(&S) -> Option<T>,
) -> Option<T> {
    strategies.iter().find_map(|s| attempt(s))
}

impl<'a> Lookup<'a> {
    pub fn new(namespace: Option<&'a str>) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> Option<&'a str> {
        self.namespace
    }

    /// Trimmed, non-empty text of `field` under `element`
    pub fn text<'e>(&self, element: &'e XmlElement, field: Field) -> Option<&'e str> {
        first_success(TEXT_STRATEGIES, |(label, strategy)| {
            let found = strategy(element, field, self.namespace)?;
            tracing::trace!("{} found via {} lookup", field.local_name(), label);
            Some(found)
        })
    }

    /// Owned variant of [`Lookup::text`]
    pub fn string(&self, element: &XmlElement, field: Field) -> Option<String> {
        self.text(element, field).map(str::to_string)
    }

    /// All descendants named `local_name`, using the first tier that finds any
    pub fn elements<'e>(&self, element: &'e XmlElement, local_name: &str) -> Vec<&'e XmlElement> {
        first_success(SET_STRATEGIES, |(label, strategy)| {
            let found = strategy(element, local_name, self.namespace);
            if found.is_empty() {
                return None;
            }
            tracing::trace!(
                "Found {} {} elements via {} lookup",
                found.len(),
                local_name,
                label
            );
            Some(found)
        })
        .unwrap_or_default()
    }

    /// First descendant named `local_name`
    pub fn element<'e>(&self, element: &'e XmlElement, local_name: &str) -> Option<&'e XmlElement> {
        self.elements(element, local_name).into_iter().next()
    }

    /// Immediate children named `local_name` (any namespace)
    pub fn children<'e>(&self, element: &'e XmlElement, local_name: &str) -> Vec<&'e XmlElement> {
        element
            .children
            .iter()
            .filter(|c| c.name == local_name)
            .collect()
    }
}

fn first_text<'e>(mut candidates: impl Iterator<Item = &'e XmlElement>) -> Option<&'e str> {
    candidates.next().and_then(XmlElement::trimmed_text)
}

fn qualified_child<'e>(
    element: &'e XmlElement,
    field: Field,
    namespace: Option<&str>,
) -> Option<&'e str> {
    let namespace = namespace?;
    let name = field.local_name();
    first_text(element.children.iter().filter(|c| c.is(name, Some(namespace))))
}

fn unqualified_child<'e>(element: &'e XmlElement, field: Field, _: Option<&str>) -> Option<&'e str> {
    let name = field.local_name();
    first_text(element.children.iter().filter(|c| c.is(name, None)))
}

fn wildcard_child<'e>(element: &'e XmlElement, field: Field, _: Option<&str>) -> Option<&'e str> {
    let name = field.local_name();
    first_text(element.children.iter().filter(|c| c.name == name))
}

fn alias_child<'e>(element: &'e XmlElement, field: Field, _: Option<&str>) -> Option<&'e str> {
    field
        .aliases()
        .iter()
        .find_map(|alias| first_text(element.children.iter().filter(|c| c.name == *alias)))
}

fn direct_child<'e>(element: &'e XmlElement, field: Field, _: Option<&str>) -> Option<&'e str> {
    let matches = |name: &str| {
        name.eq_ignore_ascii_case(field.local_name())
            || field.aliases().iter().any(|a| name.eq_ignore_ascii_case(a))
    };
    element
        .children
        .iter()
        .filter(|c| matches(&c.name))
        .find_map(XmlElement::trimmed_text)
}

fn qualified_descendants<'e>(
    element: &'e XmlElement,
    local_name: &str,
    namespace: Option<&str>,
) -> Vec<&'e XmlElement> {
    match namespace {
        Some(namespace) => element
            .descendants()
            .filter(|d| d.is(local_name, Some(namespace)))
            .collect(),
        None => Vec::new(),
    }
}

fn unqualified_descendants<'e>(
    element: &'e XmlElement,
    local_name: &str,
    _: Option<&str>,
) -> Vec<&'e XmlElement> {
    element
        .descendants()
        .filter(|d| d.is(local_name, None))
        .collect()
}

fn wildcard_descendants<'e>(
    element: &'e XmlElement,
    local_name: &str,
    _: Option<&str>,
) -> Vec<&'e XmlElement> {
    element
        .descendants()
        .filter(|d| d.name == local_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::xml::XmlDocument;

    const NS: &str = "urn:test";

    fn parse(xml: &str) -> XmlDocument {
        XmlDocument::parse_str(xml).unwrap()
    }

    #[test]
    fn test_first_success_stops_at_first_hit() {
        let mut calls = 0;
        let result = first_success(&[None, Some(2), Some(3)], |s| {
            calls += 1;
            *s
        });
        assert_eq!(result, Some(2));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_qualified_beats_unqualified() {
        let doc = parse(&format!(
            r#"<t xmlns:x="{NS}"><type>plain</type><x:type>qualified</x:type></t>"#
        ));
        let lookup = Lookup::new(Some(NS));
        assert_eq!(lookup.text(&doc.root, Field::Type), Some("qualified"));

        let lookup = Lookup::new(None);
        assert_eq!(lookup.text(&doc.root, Field::Type), Some("plain"));
    }

    #[test]
    fn test_name_alias() {
        let doc = parse(&format!(r#"<t xmlns="{NS}"><name> customers </name></t>"#));
        let lookup = Lookup::new(doc.default_namespace());
        assert_eq!(lookup.text(&doc.root, Field::Name), Some("customers"));
    }

    #[test]
    fn test_n_preferred_over_name() {
        let doc = parse("<t><name>second</name><n>first</n></t>");
        let lookup = Lookup::new(None);
        assert_eq!(lookup.text(&doc.root, Field::Name), Some("first"));
    }

    #[test]
    fn test_direct_children_case_insensitive() {
        let doc = parse("<t><NULLABLE>false</NULLABLE></t>");
        let lookup = Lookup::new(None);
        assert_eq!(lookup.text(&doc.root, Field::Nullable), Some("false"));
    }

    #[test]
    fn test_empty_text_falls_through() {
        let doc = parse("<t><n>  </n><name>real</name></t>");
        let lookup = Lookup::new(None);
        assert_eq!(lookup.text(&doc.root, Field::Name), Some("real"));
        assert_eq!(lookup.text(&doc.root, Field::Type), None);
    }

    #[test]
    fn test_elements_tiers() {
        let doc = parse(&format!(
            r#"<r xmlns:x="{NS}"><a><table/></a><x:table/><x:table/></r>"#
        ));
        let lookup = Lookup::new(Some(NS));
        assert_eq!(lookup.elements(&doc.root, "table").len(), 2);

        let lookup = Lookup::new(None);
        assert_eq!(lookup.elements(&doc.root, "table").len(), 1);

        let lookup = Lookup::new(Some("urn:other"));
        assert_eq!(lookup.elements(&doc.root, "table").len(), 1);
        assert!(lookup.elements(&doc.root, "view").is_empty());
    }
}
