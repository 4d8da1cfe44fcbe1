//! Recipient table loader
//!
//! Reads a CSV roster into an ordered row sequence and checks that all
//! required columns are present. Blank cells are left for the request
//! builder to reject per row.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Required roster columns. Header matching is order-independent and
/// accepts the legacy Chinese headers used by the original spreadsheets.
pub const REQUIRED_COLUMNS: &[&str] = &["name", "phone", "date", "time", "place"];

const HEADER_ALIASES: &[(&str, &str)] = &[
    ("名字", "name"),
    ("电话", "phone"),
    ("日期", "date"),
    ("面试时间", "time"),
    ("面试地点", "place"),
];

/// One roster record: a message target plus template fill-in values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRow {
    pub name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub place: String,
}

impl RecipientRow {
    /// Field value by canonical column name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "phone" => Some(&self.phone),
            "date" => Some(&self.date),
            "time" => Some(&self.time),
            "place" => Some(&self.place),
            _ => None,
        }
    }

    /// Canonical names of required fields that are blank on this row.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|c| {
                self.field(c)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .copied()
            .collect()
    }
}

/// Map a raw header to its canonical column name.
fn canonical_header(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    if let Some(canonical) = REQUIRED_COLUMNS
        .iter()
        .find(|c| trimmed.eq_ignore_ascii_case(c))
    {
        return Some(canonical);
    }
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, canonical)| *canonical)
}

/// Load a roster CSV from disk.
pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Vec<RecipientRow>> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| Error::Load(format!("{}: {}", path.as_ref().display(), e)))?;
    read_roster(file)
}

/// Read a roster from any CSV source.
pub fn read_roster<R: std::io::Read>(reader: R) -> Result<Vec<RecipientRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::Load(format!("unreadable header row: {}", e)))?
        .clone();

    let mut columns: HashMap<&'static str, usize> = HashMap::new();
    for (index, header) in headers.iter().enumerate() {
        if let Some(canonical) = canonical_header(header) {
            // First matching header wins
            columns.entry(canonical).or_insert(index);
        }
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.contains_key(**c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(Error::Load(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| Error::Load(format!("row {}: {}", line + 1, e)))?;
        let get = |name: &str| -> String {
            columns
                .get(name)
                .and_then(|&i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        rows.push(RecipientRow {
            name: get("name"),
            phone: get("phone"),
            date: get("date"),
            time: get("time"),
            place: get("place"),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(csv_text: &str) -> Result<Vec<RecipientRow>> {
        read_roster(csv_text.as_bytes())
    }

    #[test]
    fn reads_rows_in_file_order() {
        let rows = roster(
            "name,phone,date,time,place\n\
             Li,13711112222,05-01,14:00,Room A\n\
             Wu,+1234567,05-01,15:00,Room B\n",
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Li");
        assert_eq!(rows[0].phone, "13711112222");
        assert_eq!(rows[1].name, "Wu");
        assert_eq!(rows[1].place, "Room B");
    }

    #[test]
    fn accepts_columns_in_any_order() {
        let rows = roster(
            "place,time,date,phone,name\n\
             Room A,14:00,05-01,13711112222,Li\n",
        )
        .unwrap();

        assert_eq!(rows[0].name, "Li");
        assert_eq!(rows[0].place, "Room A");
    }

    #[test]
    fn accepts_legacy_chinese_headers() {
        let rows = roster(
            "名字,电话,日期,面试时间,面试地点\n\
             李雷,13711112222,5月1日,下午2点,东九楼\n",
        )
        .unwrap();

        assert_eq!(rows[0].name, "李雷");
        assert_eq!(rows[0].phone, "13711112222");
        assert_eq!(rows[0].time, "下午2点");
    }

    #[test]
    fn fails_fast_on_missing_columns() {
        let err = roster("name,date,time\nLi,05-01,14:00\n").unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, Error::Load(_)));
        assert!(msg.contains("phone"));
        assert!(msg.contains("place"));
        assert!(!msg.contains("name,"));
    }

    #[test]
    fn blank_cells_are_kept_for_later_validation() {
        let rows = roster(
            "name,phone,date,time,place\n\
             Li,,05-01,14:00,Room A\n",
        )
        .unwrap();

        assert_eq!(rows[0].phone, "");
        assert_eq!(rows[0].blank_fields(), vec!["phone"]);
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let rows = roster(
            "Name,Phone,Date,Time,Place\n\
             Li,137,05-01,14:00,Room A\n",
        )
        .unwrap();
        assert_eq!(rows[0].name, "Li");
    }

    #[test]
    fn extra_columns_are_ignored() {
        let rows = roster(
            "name,phone,date,time,place,notes\n\
             Li,137,05-01,14:00,Room A,vip\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].place, "Room A");
    }

    #[test]
    fn empty_roster_yields_empty_sequence() {
        let rows = roster("name,phone,date,time,place\n").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn field_lookup_by_canonical_name() {
        let row = RecipientRow {
            name: "Li".to_string(),
            phone: "137".to_string(),
            date: "05-01".to_string(),
            time: "14:00".to_string(),
            place: "Room A".to_string(),
        };
        assert_eq!(row.field("phone"), Some("137"));
        assert_eq!(row.field("unknown"), None);
    }
}
