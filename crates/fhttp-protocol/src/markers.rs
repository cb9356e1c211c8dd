//! Reply markers and line classification.
//!
//! Replies from the board are either marker lines (`[SUCCESS]`, `[PONG]`,
//! `[GET/END]`, ...) or opaque payload lines. Markers are matched by substring
//! containment: firmware builds append status text after the tag
//! (`[ERROR] Not connected to Wifi.`) and some prefix it.

use std::fmt;

/// Returns true if `needle` occurs anywhere in `text`.
///
/// An empty needle never matches, so an empty marker can never classify a
/// line.
pub fn includes(text: &str, needle: &str) -> bool {
    !needle.is_empty() && text.contains(needle)
}

/// A bracket-tagged control marker sent by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// `[GET/STARTED]`
    GetStarted,
    /// `[GET/SUCCESS]`
    GetSuccess,
    /// `[GET/END]`
    GetEnd,
    /// `[POST/SUCCESS]`
    PostSuccess,
    /// `[POST/END]`
    PostEnd,
    /// `[PUT/SUCCESS]`
    PutSuccess,
    /// `[PUT/END]`
    PutEnd,
    /// `[DELETE/SUCCESS]`
    DeleteSuccess,
    /// `[DELETE/END]`
    DeleteEnd,
    /// `[DISCONNECTED]`
    Disconnected,
    /// `[CONNECTED]`
    Connected,
    /// `[ERROR]`
    Error,
    /// `[SUCCESS]`
    Success,
    /// `[INFO]`
    Info,
    /// `[PONG]`
    Pong,
}

impl Marker {
    /// Every marker, in classification order.
    ///
    /// Verb-specific markers come first, `DISCONNECTED` is tested before
    /// `CONNECTED`, and `ERROR` before `SUCCESS`, so a line carrying two
    /// markers resolves to the more specific (or the failing) one. The
    /// bracketed vocabulary is mostly disjoint; callers should not rely on the
    /// tie-break for anything but those cases.
    pub const ALL: [Marker; 15] = [
        Marker::GetStarted,
        Marker::GetSuccess,
        Marker::GetEnd,
        Marker::PostSuccess,
        Marker::PostEnd,
        Marker::PutSuccess,
        Marker::PutEnd,
        Marker::DeleteSuccess,
        Marker::DeleteEnd,
        Marker::Disconnected,
        Marker::Connected,
        Marker::Error,
        Marker::Success,
        Marker::Info,
        Marker::Pong,
    ];

    /// The marker text as it appears on the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Marker::GetStarted => "[GET/STARTED]",
            Marker::GetSuccess => "[GET/SUCCESS]",
            Marker::GetEnd => "[GET/END]",
            Marker::PostSuccess => "[POST/SUCCESS]",
            Marker::PostEnd => "[POST/END]",
            Marker::PutSuccess => "[PUT/SUCCESS]",
            Marker::PutEnd => "[PUT/END]",
            Marker::DeleteSuccess => "[DELETE/SUCCESS]",
            Marker::DeleteEnd => "[DELETE/END]",
            Marker::Disconnected => "[DISCONNECTED]",
            Marker::Connected => "[CONNECTED]",
            Marker::Error => "[ERROR]",
            Marker::Success => "[SUCCESS]",
            Marker::Info => "[INFO]",
            Marker::Pong => "[PONG]",
        }
    }

    /// Returns true if this marker occurs anywhere in `line`.
    pub fn is_found_in(&self, line: &str) -> bool {
        includes(line, self.as_str())
    }

    /// Returns true if `line` is exactly this marker (surrounding whitespace ignored).
    pub fn is_exactly(&self, line: &str) -> bool {
        line.trim() == self.as_str()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single read produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The read timed out; there was no line.
    NoData,
    /// The line carries a known marker.
    Marker(Marker),
    /// The line carries no known marker.
    Payload,
}

impl LineKind {
    /// Get the marker if this is a marker line.
    pub fn marker(&self) -> Option<Marker> {
        match self {
            LineKind::Marker(m) => Some(*m),
            _ => None,
        }
    }
}

/// Classify a line (or the absence of one).
///
/// Markers are tested in [`Marker::ALL`] order and the first match wins.
pub fn classify(line: Option<&str>) -> LineKind {
    let Some(line) = line else {
        return LineKind::NoData;
    };

    Marker::ALL
        .iter()
        .find(|m| m.is_found_in(line))
        .map(|m| LineKind::Marker(*m))
        .unwrap_or(LineKind::Payload)
}

/// An HTTP verb whose reply is a marker-delimited stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    /// The verb name (`GET`, `POST`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }

    /// The status marker that opens a successful stream.
    pub fn success_marker(&self) -> Marker {
        match self {
            HttpVerb::Get => Marker::GetSuccess,
            HttpVerb::Post => Marker::PostSuccess,
            HttpVerb::Put => Marker::PutSuccess,
            HttpVerb::Delete => Marker::DeleteSuccess,
        }
    }

    /// The marker that closes the stream.
    pub fn end_marker(&self) -> Marker {
        match self {
            HttpVerb::Get => Marker::GetEnd,
            HttpVerb::Post => Marker::PostEnd,
            HttpVerb::Put => Marker::PutEnd,
            HttpVerb::Delete => Marker::DeleteEnd,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_exact_match() {
        assert!(includes("[PONG]", "[PONG]"));
    }

    #[test]
    fn test_includes_at_start_and_end() {
        assert!(includes("[ERROR] Failed to parse JSON.", "[ERROR]"));
        assert!(includes("WiFi: [CONNECTED]", "[CONNECTED]"));
    }

    #[test]
    fn test_includes_absent() {
        assert!(!includes("hello world", "[SUCCESS]"));
    }

    #[test]
    fn test_includes_needle_longer_than_text() {
        assert!(!includes("[OK]", "[SUCCESS]"));
    }

    #[test]
    fn test_includes_empty_needle() {
        assert!(!includes("anything", ""));
        assert!(!includes("", ""));
    }

    #[test]
    fn test_classify_no_data() {
        assert_eq!(classify(None), LineKind::NoData);
    }

    #[test]
    fn test_classify_payload() {
        let kind = classify(Some("{\"fact\":\"Cats sleep a lot.\"}"));
        assert_eq!(kind, LineKind::Payload);
        assert_eq!(kind.marker(), None);
    }

    #[test]
    fn test_classify_markers_with_trailing_text() {
        assert_eq!(
            classify(Some("[SUCCESS] Successfully connected to Wifi.")),
            LineKind::Marker(Marker::Success)
        );
        assert_eq!(
            classify(Some("[INFO] Already connected to Wifi.")),
            LineKind::Marker(Marker::Info)
        );
        assert_eq!(
            classify(Some("[GET/SUCCESS] GET request successful.")),
            LineKind::Marker(Marker::GetSuccess)
        );
    }

    #[test]
    fn test_bracketed_markers_are_disjoint() {
        // "[GET/SUCCESS]" must not read as "[SUCCESS]", nor "[DISCONNECTED]" as "[CONNECTED]".
        assert!(!Marker::Success.is_found_in("[GET/SUCCESS]"));
        assert!(!Marker::Connected.is_found_in("[DISCONNECTED]"));
        assert!(!Marker::Connected.is_found_in("[AP/CONNECTED]"));
    }

    #[test]
    fn test_tie_break_order() {
        assert_eq!(
            classify(Some("[SUCCESS] then [ERROR]")),
            LineKind::Marker(Marker::Error)
        );
        assert_eq!(
            classify(Some("[CONNECTED] [DISCONNECTED]")),
            LineKind::Marker(Marker::Disconnected)
        );
        assert_eq!(
            classify(Some("[ERROR] [GET/END]")),
            LineKind::Marker(Marker::GetEnd)
        );
    }

    #[test]
    fn test_all_markers_classify_to_themselves() {
        for marker in Marker::ALL {
            assert_eq!(classify(Some(marker.as_str())), LineKind::Marker(marker));
        }
    }

    #[test]
    fn test_is_exactly() {
        assert!(Marker::GetEnd.is_exactly("[GET/END]"));
        assert!(Marker::GetEnd.is_exactly("[GET/END] "));
        assert!(!Marker::GetEnd.is_exactly("body [GET/END]"));
    }

    #[test]
    fn test_verb_markers() {
        assert_eq!(HttpVerb::Get.success_marker(), Marker::GetSuccess);
        assert_eq!(HttpVerb::Delete.end_marker(), Marker::DeleteEnd);
        assert_eq!(HttpVerb::Put.to_string(), "PUT");
    }
}
