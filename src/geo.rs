use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use maxminddb::{Reader, geoip2};
use parking_lot::RwLock;

use crate::error::Result;

const FALLBACK_LANG: &str = "en";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoRecord {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl fmt::Display for GeoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.country, &self.region, &self.city]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Location lookup for an address. Failure and "no data" both yield `None`.
pub trait GeoLookup: Send + Sync {
    fn locate(&self, ip: IpAddr) -> Option<GeoRecord>;
}

/// Lookup backed by a MaxMind City database file.
pub struct MaxMindGeo {
    reader: Reader<Vec<u8>>,
    lang: String,
    cache: RwLock<HashMap<IpAddr, Option<GeoRecord>>>,
}

impl MaxMindGeo {
    pub fn open<P: AsRef<Path>>(path: P, lang: &str) -> Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(MaxMindGeo {
            reader,
            lang: lang.to_string(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn do_lookup(&self, ip: IpAddr) -> Option<GeoRecord> {
        let city: geoip2::City = self.reader.lookup(ip).ok()?;

        let country = city.country.as_ref().and_then(|c| localized_name(c.names.as_ref(), &self.lang));
        let region = city
            .subdivisions
            .as_ref()
            .and_then(|s| s.first())
            .and_then(|s| localized_name(s.names.as_ref(), &self.lang));
        let city_name = city.city.as_ref().and_then(|c| localized_name(c.names.as_ref(), &self.lang));

        if country.is_none() && region.is_none() && city_name.is_none() {
            return None;
        }
        Some(GeoRecord {
            country,
            region,
            city: city_name,
        })
    }
}

/// Name in `lang`, else in English.
fn localized_name(names: Option<&BTreeMap<&str, &str>>, lang: &str) -> Option<String> {
    let names = names?;
    names
        .get(lang)
        .or_else(|| names.get(FALLBACK_LANG))
        .map(|s| s.to_string())
}

impl GeoLookup for MaxMindGeo {
    fn locate(&self, ip: IpAddr) -> Option<GeoRecord> {
        if let Some(hit) = self.cache.read().get(&ip) {
            return hit.clone();
        }
        let geo = self.do_lookup(ip);
        self.cache.write().insert(ip, geo.clone());
        geo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_present_fields() {
        let full = GeoRecord {
            country: Some("Germany".into()),
            region: Some("Hesse".into()),
            city: Some("Frankfurt".into()),
        };
        assert_eq!(full.to_string(), "Germany Hesse Frankfurt");

        let partial = GeoRecord {
            country: Some("Germany".into()),
            ..Default::default()
        };
        assert_eq!(partial.to_string(), "Germany");
    }

    #[test]
    fn names_fall_back_to_english() {
        let names = BTreeMap::from([("en", "Germany"), ("de", "Deutschland")]);
        assert_eq!(localized_name(Some(&names), "de").as_deref(), Some("Deutschland"));
        assert_eq!(localized_name(Some(&names), "ja").as_deref(), Some("Germany"));

        let no_english = BTreeMap::from([("fr", "Allemagne")]);
        assert_eq!(localized_name(Some(&no_english), "ja"), None);
        assert_eq!(localized_name(None, "en"), None);
    }

    #[test]
    fn missing_database_fails_to_open() {
        assert!(MaxMindGeo::open("/nonexistent/GeoLite2-City.mmdb", "en").is_err());
    }
}
