use ipp::attribute::IppAttribute;
use ipp::value::IppValue;
use std::collections::BTreeMap;

/// A decoded `media-col` collection (PWG 5100.7 §3.10), the structured
/// alternative to the legacy `media` keyword. Fields absent from the wire
/// collection are left `None` rather than defaulted, since a default here
/// would silently mask a client omission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaCollection {
    pub size_name: Option<String>,
    pub size_width: Option<i32>,
    pub size_length: Option<i32>,
    pub bottom_margin: Option<i32>,
    pub top_margin: Option<i32>,
    pub left_margin: Option<i32>,
    pub right_margin: Option<i32>,
    pub source: Option<String>,
    pub top_offset: Option<i32>,
    pub tracking: Option<String>,
    pub media_type: Option<String>,
}

impl MediaCollection {
    /// Import from the `media-col` collection value sent by the client.
    /// Unknown member names are ignored; a non-collection value yields an
    /// all-`None` result rather than an error, leaving validation to the
    /// caller.
    pub fn from_ipp_value(value: &IppValue) -> MediaCollection {
        let mut out = MediaCollection::default();
        let members = match value {
            IppValue::Collection(members) => members,
            _ => return out,
        };
        for (name, v) in members {
            match name.as_str() {
                "media-size" => {
                    if let IppValue::Collection(size) = v {
                        out.size_width = size.get("x-dimension").and_then(IppValue::as_integer).copied();
                        out.size_length = size.get("y-dimension").and_then(IppValue::as_integer).copied();
                    }
                }
                "media-size-name" => out.size_name = v.as_keyword().cloned(),
                "media-bottom-margin" => out.bottom_margin = v.as_integer().copied(),
                "media-top-margin" => out.top_margin = v.as_integer().copied(),
                "media-left-margin" => out.left_margin = v.as_integer().copied(),
                "media-right-margin" => out.right_margin = v.as_integer().copied(),
                "media-source" => out.source = v.as_keyword().cloned(),
                "media-top-offset" => out.top_offset = v.as_integer().copied(),
                "media-tracking" => out.tracking = v.as_keyword().cloned(),
                "media-type" => out.media_type = v.as_keyword().cloned(),
                _ => {}
            }
        }
        out
    }

    /// Read `media-col` straight off an attribute group, returning `None`
    /// when the member is absent rather than an empty collection.
    pub fn from_attribute(attr: Option<&IppAttribute>) -> Option<MediaCollection> {
        attr.map(|a| MediaCollection::from_ipp_value(a.value()))
    }

    /// Export back to a `media-col` collection value for Get-Printer-Attributes
    /// responses and `job-media-sheets`/`media-col-ready` style attributes.
    pub fn to_ipp_value(&self) -> IppValue {
        let mut members: BTreeMap<String, IppValue> = BTreeMap::new();
        if self.size_width.is_some() || self.size_length.is_some() {
            let mut size: BTreeMap<String, IppValue> = BTreeMap::new();
            if let Some(w) = self.size_width {
                size.insert("x-dimension".to_string(), IppValue::Integer(w));
            }
            if let Some(l) = self.size_length {
                size.insert("y-dimension".to_string(), IppValue::Integer(l));
            }
            members.insert("media-size".to_string(), IppValue::Collection(size));
        }
        if let Some(name) = &self.size_name {
            members.insert("media-size-name".to_string(), IppValue::Keyword(name.clone()));
        }
        if let Some(m) = self.bottom_margin {
            members.insert("media-bottom-margin".to_string(), IppValue::Integer(m));
        }
        if let Some(m) = self.top_margin {
            members.insert("media-top-margin".to_string(), IppValue::Integer(m));
        }
        if let Some(m) = self.left_margin {
            members.insert("media-left-margin".to_string(), IppValue::Integer(m));
        }
        if let Some(m) = self.right_margin {
            members.insert("media-right-margin".to_string(), IppValue::Integer(m));
        }
        if let Some(source) = &self.source {
            members.insert("media-source".to_string(), IppValue::Keyword(source.clone()));
        }
        if let Some(offset) = self.top_offset {
            members.insert("media-top-offset".to_string(), IppValue::Integer(offset));
        }
        if let Some(tracking) = &self.tracking {
            members.insert("media-tracking".to_string(), IppValue::Keyword(tracking.clone()));
        }
        if let Some(media_type) = &self.media_type {
            members.insert("media-type".to_string(), IppValue::Keyword(media_type.clone()));
        }
        IppValue::Collection(members)
    }

    pub fn to_attribute(&self, name: impl Into<String>) -> IppAttribute {
        IppAttribute::new(name.into(), self.to_ipp_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_value() -> IppValue {
        let mut size = BTreeMap::new();
        size.insert("x-dimension".to_string(), IppValue::Integer(21000));
        size.insert("y-dimension".to_string(), IppValue::Integer(29700));

        let mut members = BTreeMap::new();
        members.insert("media-size".to_string(), IppValue::Collection(size));
        members.insert("media-size-name".to_string(), IppValue::Keyword("iso-a4".to_string()));
        members.insert("media-source".to_string(), IppValue::Keyword("main".to_string()));
        IppValue::Collection(members)
    }

    #[test]
    fn round_trips_known_members() {
        let decoded = MediaCollection::from_ipp_value(&sample_value());
        assert_eq!(decoded.size_width, Some(21000));
        assert_eq!(decoded.size_length, Some(29700));
        assert_eq!(decoded.size_name.as_deref(), Some("iso-a4"));
        assert_eq!(decoded.source.as_deref(), Some("main"));
        assert_eq!(decoded.bottom_margin, None);

        let encoded = decoded.to_ipp_value();
        let redecoded = MediaCollection::from_ipp_value(&encoded);
        assert_eq!(decoded, redecoded);
    }

    #[test]
    fn non_collection_value_yields_empty_result() {
        let decoded = MediaCollection::from_ipp_value(&IppValue::Keyword("iso-a4".to_string()));
        assert_eq!(decoded, MediaCollection::default());
    }

    #[test]
    fn unknown_members_are_ignored() {
        let mut members = BTreeMap::new();
        members.insert("media-weight-metric".to_string(), IppValue::Integer(80));
        let decoded = MediaCollection::from_ipp_value(&IppValue::Collection(members));
        assert_eq!(decoded, MediaCollection::default());
    }
}
