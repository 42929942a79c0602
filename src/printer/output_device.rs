//! Output-device (proxy) bookkeeping: a remote or detached printing
//! endpoint that fetches jobs from a Printer via explicit IPP operations
//! rather than through a local `Driver` (§4.7's Update-Active-Jobs,
//! Update-Output-Device-Attributes and Acknowledge-Identify-Printer all
//! act on one `OutputDevice` entry here).

use crate::model::IdentifyActions;
use ipp::attribute::IppAttribute;
use ipp::value::IppValue;
use std::collections::HashMap;
use uuid::Uuid;

/// One registered proxy endpoint, keyed by the `output-device-uuid` it
/// presents on Update-Active-Jobs/Update-Output-Device-Attributes.
#[derive(Debug, Clone)]
pub struct OutputDevice {
    pub uuid: Uuid,
    /// Last attribute set this endpoint reported about itself.
    pub attributes: HashMap<String, IppAttribute>,
    /// Drained by Acknowledge-Identify-Printer.
    pub pending_identify: Option<(IdentifyActions, String)>,
}

impl OutputDevice {
    pub fn new(uuid: Uuid) -> OutputDevice {
        OutputDevice {
            uuid,
            attributes: HashMap::new(),
            pending_identify: None,
        }
    }

    /// Apply one `Update-Output-Device-Attributes` name/value pair. A bare
    /// name replaces the attribute wholesale; `base.N` or `base.START-END`
    /// replaces that subrange of an existing multi-valued `base`,
    /// preserving the ordering of untouched values; a `NoValue` payload
    /// deletes the attribute (or subrange) instead of writing it.
    pub fn apply_attribute(&mut self, name: &str, value: IppValue) {
        match parse_sparse_name(name) {
            Some((base, range)) => self.apply_subrange(base, range, value),
            None => {
                if matches!(value, IppValue::NoValue) {
                    self.attributes.remove(name);
                } else {
                    self.attributes.insert(name.to_string(), IppAttribute::new(name, value));
                }
            }
        }
    }

    fn apply_subrange(&mut self, base: &str, range: (usize, usize), value: IppValue) {
        let mut values = match self.attributes.get(base).map(|a| a.value()) {
            Some(IppValue::Array(v)) => v.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        };
        let (start, end) = range;
        if end >= values.len() {
            values.resize(end + 1, IppValue::NoValue);
        }
        if matches!(value, IppValue::NoValue) {
            values.drain(start..=end);
        } else {
            for slot in &mut values[start..=end] {
                *slot = value.clone();
            }
        }
        if values.is_empty() {
            self.attributes.remove(base);
        } else {
            self.attributes.insert(base.to_string(), IppAttribute::new(base, IppValue::Array(values)));
        }
    }
}

/// Parse `base.INDEX` or `base.START-END` into `(base, (start, end))`,
/// zero-based and inclusive. Plain names (no trailing `.N`/`.N-M`) return
/// `None` so the caller falls back to a wholesale replace.
fn parse_sparse_name(name: &str) -> Option<(&str, (usize, usize))> {
    let (base, suffix) = name.rsplit_once('.')?;
    if let Ok(index) = suffix.parse::<usize>() {
        return Some((base, (index, index)));
    }
    let (start, end) = suffix.split_once('-')?;
    Some((base, (start.parse().ok()?, end.parse().ok()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_index() {
        assert_eq!(parse_sparse_name("output-device-supply-info.2"), Some(("output-device-supply-info", (2, 2))));
    }

    #[test]
    fn parses_range() {
        assert_eq!(parse_sparse_name("output-device-supply-info.1-3"), Some(("output-device-supply-info", (1, 3))));
    }

    #[test]
    fn plain_name_has_no_range() {
        assert_eq!(parse_sparse_name("output-device-name"), None);
    }

    #[test]
    fn sparse_update_replaces_only_the_targeted_slot() {
        let mut dev = OutputDevice::new(Uuid::nil());
        dev.apply_attribute(
            "marker-levels",
            IppValue::Array(vec![IppValue::Integer(10), IppValue::Integer(20), IppValue::Integer(30)]),
        );
        dev.apply_attribute("marker-levels.1", IppValue::Integer(99));
        match dev.attributes.get("marker-levels").unwrap().value() {
            IppValue::Array(values) => assert_eq!(values, &vec![IppValue::Integer(10), IppValue::Integer(99), IppValue::Integer(30)]),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn delete_value_removes_subrange() {
        let mut dev = OutputDevice::new(Uuid::nil());
        dev.apply_attribute("marker-levels", IppValue::Array(vec![IppValue::Integer(10), IppValue::Integer(20)]));
        dev.apply_attribute("marker-levels.0", IppValue::NoValue);
        match dev.attributes.get("marker-levels").unwrap().value() {
            IppValue::Array(values) => assert_eq!(values, &vec![IppValue::Integer(20)]),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn wholesale_replace_on_plain_name() {
        let mut dev = OutputDevice::new(Uuid::nil());
        dev.apply_attribute("output-device-name", IppValue::NameWithoutLanguage("proxy-1".to_string()));
        assert_eq!(dev.attributes.len(), 1);
        dev.apply_attribute("output-device-name", IppValue::NoValue);
        assert!(dev.attributes.is_empty());
    }
}
