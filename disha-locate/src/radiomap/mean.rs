//! Parsed mean radio map, the structure estimators run against.

use crate::error::{Error, Result};
use crate::logfile::{is_valid_mac, normalize_separators};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Mean radio map: one averaged fingerprint row per location, aligned to
/// the MAC order fixed by the file header.
///
/// Rows keep the order they appear in the file, which the writer emits
/// sorted by location key; iteration over `rows()` is therefore
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanRadioMap {
    mac_order: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

impl MeanRadioMap {
    /// Assemble a map from already-aligned rows. Every row must have
    /// exactly one value per MAC in `mac_order`.
    pub fn new(mac_order: Vec<String>, rows: Vec<(String, Vec<f64>)>) -> Result<Self> {
        for (key, values) in &rows {
            if values.len() != mac_order.len() {
                return Err(Error::RadioMap(format!(
                    "row '{}' has {} values for {} MAC addresses",
                    key,
                    values.len(),
                    mac_order.len()
                )));
            }
        }
        Ok(Self { mac_order, rows })
    }

    /// Parse a mean radio map file.
    ///
    /// The header row fixes the MAC order; every data row must carry two
    /// coordinates plus exactly one value per MAC.
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::RadioMap(format!("{}: empty file", path.display()))),
        };
        if !header.starts_with('#') {
            return Err(Error::RadioMap(format!(
                "{}: missing '#' header row",
                path.display()
            )));
        }
        let normalized = normalize_separators(&header);
        let fields: Vec<&str> = normalized.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(Error::RadioMap(format!(
                "{}: header has {} fields, expected at least 4",
                path.display(),
                fields.len()
            )));
        }
        let mut mac_order = Vec::with_capacity(fields.len() - 3);
        for mac in &fields[3..] {
            if !is_valid_mac(mac) {
                return Err(Error::RadioMap(format!(
                    "{}: '{}' in header is not a MAC address",
                    path.display(),
                    mac
                )));
            }
            mac_order.push((*mac).to_string());
        }

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            let line_num = idx + 2;
            if line.trim().is_empty() {
                continue;
            }
            let normalized = normalize_separators(&line);
            let fields: Vec<&str> = normalized.split_whitespace().collect();
            if fields.len() != mac_order.len() + 2 {
                return Err(Error::RadioMap(format!(
                    "{}: line {}: {} fields, expected {}",
                    path.display(),
                    line_num,
                    fields.len(),
                    mac_order.len() + 2
                )));
            }
            let key = format!("{} {}", fields[0], fields[1]);
            let mut values = Vec::with_capacity(mac_order.len());
            for field in &fields[2..] {
                let value: f64 = field.parse().map_err(|_| {
                    Error::RadioMap(format!(
                        "{}: line {}: '{}' is not a number",
                        path.display(),
                        line_num,
                        field
                    ))
                })?;
                values.push(value);
            }
            rows.push((key, values));
        }

        Ok(Self { mac_order, rows })
    }

    /// Canonical MAC address order of this map.
    pub fn mac_order(&self) -> &[String] {
        &self.mac_order
    }

    /// Fingerprint rows in file order.
    pub fn rows(&self) -> &[(String, Vec<f64>)] {
        &self.rows
    }

    /// Number of surveyed locations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fingerprint of a single location, if present.
    pub fn vector(&self, key: &str) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_map(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_mean_map() {
        let f = write_map(
            "# X, Y, aa:aa:aa:aa:aa:aa, bb:bb:bb:bb:bb:bb\n\
             0, 0, -50.0, -70.0\n\
             10, 0, -80.0, -40.0\n",
        );
        let map = MeanRadioMap::from_file(f.path()).unwrap();
        assert_eq!(map.mac_order().len(), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.vector("0 0"), Some(&[-50.0, -70.0][..]));
        assert_eq!(map.vector("10 0"), Some(&[-80.0, -40.0][..]));
    }

    #[test]
    fn rejects_row_length_mismatch() {
        let f = write_map(
            "# X, Y, aa:aa:aa:aa:aa:aa, bb:bb:bb:bb:bb:bb\n\
             0, 0, -50.0\n",
        );
        assert!(MeanRadioMap::from_file(f.path()).is_err());
    }

    #[test]
    fn rejects_missing_header() {
        let f = write_map("0, 0, -50.0, -70.0\n");
        assert!(MeanRadioMap::from_file(f.path()).is_err());
    }

    #[test]
    fn rejects_bad_header_mac() {
        let f = write_map("# X, Y, aa:aa:aa:aa:aa:aa, not-a-mac\n");
        assert!(MeanRadioMap::from_file(f.path()).is_err());
    }

    #[test]
    fn new_checks_alignment() {
        let macs = vec!["aa:aa:aa:aa:aa:aa".to_string()];
        assert!(MeanRadioMap::new(macs.clone(), vec![("0 0".into(), vec![-50.0])]).is_ok());
        assert!(MeanRadioMap::new(macs, vec![("0 0".into(), vec![-50.0, -60.0])]).is_err());
    }
}
