use ipp::attribute::{IppAttribute, IppAttributes};
use ipp::model::DelimiterTag;
use ipp::value::IppValue;
use std::collections::HashSet;

/// Attribute names that are expensive to compute or large to serialise and
/// are therefore excluded from an `all`/unqualified request, mirroring the
/// reference implementation's treatment of `media-col-database`.
const HEAVYWEIGHT: &[&str] = &["media-col-database", "printer-icc-profiles"];

/// The parsed `requested-attributes` operation attribute: either an explicit
/// set of names, or "all" (no attribute present, or the single keyword
/// `all`).
#[derive(Debug, Clone)]
pub struct RequestedAttributes {
    names: Option<HashSet<String>>,
}

impl RequestedAttributes {
    pub fn all() -> RequestedAttributes {
        RequestedAttributes { names: None }
    }

    pub fn of(names: impl IntoIterator<Item = String>) -> RequestedAttributes {
        RequestedAttributes {
            names: Some(names.into_iter().collect()),
        }
    }

    pub fn is_all(&self) -> bool {
        self.names.is_none()
    }

    pub fn contains(&self, name: &str) -> bool {
        match &self.names {
            None => true,
            Some(names) => names.contains(name),
        }
    }
}

/// Copies subsets of attributes between attribute sets (§4.2).
pub struct IppFilter;

impl IppFilter {
    /// `requestedArray`: produce the ordered, deduplicated set of attribute
    /// names named by the `requested-attributes` operation attribute,
    /// defaulting to "all" when absent.
    pub fn requested_array(request: &IppAttributes) -> RequestedAttributes {
        let requested = request
            .groups_of(DelimiterTag::OperationAttributes)
            .find_map(|g| g.attributes().get(IppAttribute::REQUESTED_ATTRIBUTES));
        match requested.map(|a| a.value()) {
            None => RequestedAttributes::all(),
            Some(IppValue::Keyword(k)) if k == "all" => RequestedAttributes::all(),
            Some(IppValue::Keyword(k)) => RequestedAttributes::of([k.clone()]),
            Some(value) => {
                let names: Vec<String> = value
                    .into_iter()
                    .filter_map(|v| v.as_keyword().cloned())
                    .collect();
                if names.iter().any(|n| n == "all") {
                    RequestedAttributes::all()
                } else {
                    RequestedAttributes::of(names)
                }
            }
        }
    }

    /// `copyAttributes`: copy every attribute from `src` whose group tag
    /// matches `required_group` (`None` = any group), whose name is
    /// requested (or the request is "all"), skipping heavyweight attributes
    /// unless explicitly named, into `dst` under `dst_group`.
    pub fn copy_attributes(
        dst: &mut IppAttributes,
        src: &IppAttributes,
        requested: &RequestedAttributes,
        required_group: Option<DelimiterTag>,
        dst_group: DelimiterTag,
    ) {
        let groups: Vec<_> = match required_group {
            Some(tag) => src.groups_of(tag).collect(),
            None => src.groups().iter().collect(),
        };
        for group in groups {
            for (name, attr) in group.attributes() {
                if HEAVYWEIGHT.contains(&name.as_str()) && requested.is_all() {
                    continue;
                }
                if !requested.contains(name) {
                    continue;
                }
                dst.add(dst_group, attr.clone());
            }
        }
    }

    /// Copy a single, already-built attribute list, applying the same
    /// requested-names and heavyweight filtering. Used by the Printer/Job
    /// attribute assemblers, which synthesise attributes on the fly rather
    /// than holding them in a pre-built `IppAttributes`.
    pub fn copy_built(dst: &mut IppAttributes, attrs: Vec<IppAttribute>, requested: &RequestedAttributes, dst_group: DelimiterTag) {
        for attr in attrs {
            if HEAVYWEIGHT.contains(&attr.name()) && requested.is_all() {
                continue;
            }
            if !requested.contains(attr.name()) {
                continue;
            }
            dst.add(dst_group, attr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_requested_includes_everything_but_heavyweight() {
        let requested = RequestedAttributes::all();
        assert!(requested.contains("printer-name"));
        assert!(requested.is_all());
    }

    #[test]
    fn explicit_set_only_matches_named_attributes() {
        let requested = RequestedAttributes::of(["printer-name".to_string(), "job-id".to_string()]);
        assert!(requested.contains("printer-name"));
        assert!(!requested.contains("printer-state"));
    }

    #[test]
    fn copy_built_skips_heavyweight_unless_requested_by_name() {
        let mut dst = IppAttributes::new();
        let attrs = vec![
            IppAttribute::new("printer-name", IppValue::Keyword("p1".to_string())),
            IppAttribute::new("media-col-database", IppValue::Keyword("x".to_string())),
        ];
        IppFilter::copy_built(&mut dst, attrs.clone(), &RequestedAttributes::all(), DelimiterTag::PrinterAttributes);
        let names: Vec<_> = dst
            .groups_of(DelimiterTag::PrinterAttributes)
            .flat_map(|g| g.attributes().keys().cloned())
            .collect();
        assert!(names.contains(&"printer-name".to_string()));
        assert!(!names.contains(&"media-col-database".to_string()));

        let mut dst2 = IppAttributes::new();
        let explicit = RequestedAttributes::of(["media-col-database".to_string()]);
        IppFilter::copy_built(&mut dst2, attrs, &explicit, DelimiterTag::PrinterAttributes);
        let names2: Vec<_> = dst2
            .groups_of(DelimiterTag::PrinterAttributes)
            .flat_map(|g| g.attributes().keys().cloned())
            .collect();
        assert_eq!(names2, vec!["media-col-database".to_string()]);
    }
}
