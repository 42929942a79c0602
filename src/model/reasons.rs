use ipp::value::IppValue;

macro_rules! bitset {
    ($(#[$meta:meta])* $name:ident { $($flag:ident = $bit:expr => $keyword:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name(u32);

        impl $name {
            pub const NONE: $name = $name(0);
            $(
                pub const $flag: $name = $name(1 << $bit);
            )+

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: $name) {
                self.0 &= !other.0;
            }

            /// Render as the ordered keyword array the protocol expects,
            /// falling back to the single keyword `none` when empty.
            pub fn keywords(self) -> Vec<&'static str> {
                let mut out = Vec::new();
                $(
                    if self.contains($name::$flag) {
                        out.push($keyword);
                    }
                )+
                if out.is_empty() {
                    out.push("none");
                }
                out
            }

            /// Parse a single keyword into its flag, if recognised.
            pub fn from_keyword(keyword: &str) -> Option<$name> {
                $(
                    if keyword == $keyword {
                        return Some($name::$flag);
                    }
                )+
                None
            }

            /// Fold an iterator of keywords (as produced by an IPP `1setOf
            /// keyword` attribute) into a combined bitset, ignoring unknown
            /// keywords rather than rejecting the whole request.
            pub fn from_keywords<'a>(keywords: impl IntoIterator<Item = &'a str>) -> $name {
                let mut out = $name::NONE;
                for kw in keywords {
                    if let Some(flag) = $name::from_keyword(kw) {
                        out.insert(flag);
                    }
                }
                out
            }

            pub fn to_ipp_value(self) -> IppValue {
                let keywords = self.keywords();
                if keywords.len() == 1 {
                    IppValue::Keyword(keywords[0].to_string())
                } else {
                    IppValue::Array(
                        keywords
                            .into_iter()
                            .map(|k| IppValue::Keyword(k.to_string()))
                            .collect(),
                    )
                }
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitset! {
    /// `printer-state-reasons`, RFC 8011 §5.4.12, plus the PWG 5100.22
    /// synthetic reasons the Printer assembles on the fly (moving-to-paused,
    /// paused, hold-new-jobs, wifi-not-configured-report).
    PrinterStateReasons {
        MEDIA_LOW = 0 => "media-low-warning",
        MEDIA_EMPTY = 1 => "media-empty-error",
        TONER_LOW = 2 => "toner-low-warning",
        TONER_EMPTY = 3 => "toner-empty-error",
        DOOR_OPEN = 4 => "door-open-warning",
        MEDIA_JAM = 5 => "media-jam-warning",
        OFFLINE = 6 => "offline-report",
        MOVING_TO_PAUSED = 7 => "moving-to-paused",
        PAUSED = 8 => "paused",
        HOLD_NEW_JOBS = 9 => "hold-new-jobs",
        WIFI_NOT_CONFIGURED = 10 => "wifi-not-configured-report",
        IDENTIFY_PRINTER_REQUESTED = 11 => "identify-printer-requested",
    }
}

bitset! {
    /// `job-state-reasons`, RFC 8011 §5.3.8, restricted to the subset the
    /// scheduler and the document pipeline can actually produce.
    JobStateReasons {
        JOB_INCOMING = 0 => "job-incoming",
        JOB_DATA_INSUFFICIENT = 1 => "job-data-insufficient",
        DOCUMENT_FORMAT_ERROR = 2 => "document-format-error",
        PROCESSING_TO_STOP_POINT = 3 => "processing-to-stop-point",
        JOB_CANCELED_BY_USER = 4 => "job-canceled-by-user",
        JOB_COMPLETED_SUCCESSFULLY = 5 => "job-completed-successfully",
        ABORTED_BY_SYSTEM = 6 => "aborted-by-system",
        JOB_FETCHABLE = 7 => "job-fetchable",
    }
}

bitset! {
    /// `identify-actions`, PWG 5100.13 §5.1.
    IdentifyActions {
        DISPLAY = 0 => "display",
        FLASH = 1 => "flash",
        SOUND = 2 => "sound",
        SPEAK = 3 => "speak",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renders_none() {
        assert_eq!(PrinterStateReasons::NONE.keywords(), vec!["none"]);
    }

    #[test]
    fn combination_renders_all_set_flags() {
        let reasons = PrinterStateReasons::PAUSED | PrinterStateReasons::HOLD_NEW_JOBS;
        let kw = reasons.keywords();
        assert!(kw.contains(&"paused"));
        assert!(kw.contains(&"hold-new-jobs"));
        assert_eq!(kw.len(), 2);
    }

    #[test]
    fn parses_requested_identify_actions() {
        let actions = IdentifyActions::from_keywords(["display", "bogus", "sound"]);
        assert!(actions.contains(IdentifyActions::DISPLAY));
        assert!(actions.contains(IdentifyActions::SOUND));
        assert!(!actions.contains(IdentifyActions::FLASH));
    }

    #[test]
    fn insert_and_remove() {
        let mut r = JobStateReasons::NONE;
        r.insert(JobStateReasons::JOB_FETCHABLE);
        assert!(r.contains(JobStateReasons::JOB_FETCHABLE));
        r.remove(JobStateReasons::JOB_FETCHABLE);
        assert!(r.is_empty());
    }
}
