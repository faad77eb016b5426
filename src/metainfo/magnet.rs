use super::error::MetainfoError;
use super::info_hash::InfoHash;

/// A parsed magnet link (BEP-9).
///
/// Only the `xt` (info hash) and first `tr` (tracker) parameters are
/// used; `dn` is kept for display and everything else is ignored.
///
/// # Examples
///
/// ```
/// use btget::metainfo::MagnetLink;
///
/// let magnet = MagnetLink::parse(
///     "magnet:?xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a\
///      &tr=http%3A%2F%2Ftracker.example.com%2Fannounce",
/// ).unwrap();
/// assert_eq!(
///     magnet.tracker.as_deref(),
///     Some("http://tracker.example.com/announce")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MagnetLink {
    /// The torrent's info hash from `xt=urn:btih:<40 hex>`.
    pub info_hash: InfoHash,
    /// Suggested display name, if the link carried one.
    pub display_name: Option<String>,
    /// The first tracker URL, percent-decoded.
    pub tracker: Option<String>,
}

impl MagnetLink {
    /// Parses a magnet URI.
    ///
    /// # Errors
    ///
    /// Returns [`MetainfoError::InvalidMagnetLink`] when the `magnet:?`
    /// prefix or the `xt` parameter is missing, the info hash is not 40
    /// hex characters, or a parameter value has a malformed percent
    /// escape.
    pub fn parse(uri: &str) -> Result<Self, MetainfoError> {
        let query = uri
            .strip_prefix("magnet:?")
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing magnet:? prefix".into()))?;

        let mut info_hash = None;
        let mut display_name = None;
        let mut tracker = None;

        for param in query.split('&') {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            match key {
                "xt" => {
                    let hex = value.strip_prefix("urn:btih:").ok_or_else(|| {
                        MetainfoError::InvalidMagnetLink("unsupported xt format".into())
                    })?;
                    let hash = InfoHash::from_hex(hex).map_err(|_| {
                        MetainfoError::InvalidMagnetLink("info hash is not 40 hex chars".into())
                    })?;
                    info_hash = Some(hash);
                }
                "dn" => display_name = Some(percent_decode(value)?),
                "tr" if tracker.is_none() => tracker = Some(percent_decode(value)?),
                _ => {}
            }
        }

        let info_hash = info_hash
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing xt parameter".into()))?;

        Ok(Self {
            info_hash,
            display_name,
            tracker,
        })
    }

    /// The tracker URL, or an error when the link carried none.
    pub fn require_tracker(&self) -> Result<&str, MetainfoError> {
        self.tracker
            .as_deref()
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("no tracker parameter".into()))
    }
}

fn percent_decode(s: &str) -> Result<String, MetainfoError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| {
                        MetainfoError::InvalidMagnetLink(format!("bad percent escape in {s:?}"))
                    })?;
                out.push(hex);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out)
        .map_err(|_| MetainfoError::InvalidMagnetLink("decoded value is not UTF-8".into()))
}
