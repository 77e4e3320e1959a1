//! Cross-check of the address book against an externally produced list of
//! CREATE2 deployments (`ContractName,Address,PreSalt` CSV).

use std::collections::BTreeMap;

use crate::AddressBook;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("csv is empty")]
    Empty,

    #[error("csv header lacks column {0:?}")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Create2Entry {
    pub name: String,
    pub address: String,
    pub presalt: Option<String>,
}

/// Parse the CSV. Blank lines are skipped, fields are not quoted.
pub fn parse_create2_csv(content: &str) -> Result<Vec<Create2Entry>, CsvError> {
    let mut lines = content.lines();
    let header = lines.next().ok_or(CsvError::Empty)?;
    let cols = header.split(',').map(str::trim).collect::<Vec<_>>();
    let col = |name: &'static str| {
        cols.iter()
            .position(|c| *c == name)
            .ok_or(CsvError::MissingColumn(name))
    };
    let name_idx = col("ContractName")?;
    let addr_idx = col("Address")?;
    let salt_idx = cols.iter().position(|c| *c == "PreSalt");

    let mut entries = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let vals = line.split(',').map(str::trim).collect::<Vec<_>>();
        let get = |i: usize| vals.get(i).copied().unwrap_or_default().to_string();
        entries.push(Create2Entry {
            name: get(name_idx),
            address: get(addr_idx),
            presalt: salt_idx.map(get).filter(|s| !s.is_empty()),
        });
    }
    Ok(entries)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Listed in the CSV but absent from the address book.
    MissingInBook(String),
    AddressMismatch {
        name: String,
        csv: String,
        book: String,
    },
    AddressMatch(String),
    /// Deployed according to the address book but not listed in the CSV.
    MissingInCsv(String),
    PresaltMismatch {
        name: String,
        csv: Option<String>,
        book: Option<String>,
    },
    PresaltMatch(String),
}

impl Finding {
    /// Mismatches and entries the book lacks. Book-only entries are
    /// expected for contracts deployed without the factory.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            Self::MissingInBook(_) | Self::AddressMismatch { .. } | Self::PresaltMismatch { .. }
        )
    }
}

/// Compare addresses (case-insensitively) and presalts.
///
/// Address findings come first, followed by presalt findings, each in CSV
/// order; book-only entries follow the address findings.
pub fn compare_create2(entries: &[Create2Entry], book: &AddressBook) -> Vec<Finding> {
    let deployed = book
        .iter()
        .filter_map(|(name, r)| {
            r.address.map(|a| {
                (
                    name.as_str(),
                    (a.to_string().to_lowercase(), r.lens_create2_pre_salt.clone()),
                )
            })
        })
        .collect::<BTreeMap<_, _>>();

    let mut findings = Vec::new();
    for e in entries {
        match deployed.get(e.name.as_str()) {
            None => findings.push(Finding::MissingInBook(e.name.clone())),
            Some((addr, _)) if *addr != e.address.to_lowercase() => {
                findings.push(Finding::AddressMismatch {
                    name: e.name.clone(),
                    csv: e.address.to_lowercase(),
                    book: addr.clone(),
                })
            }
            Some(_) => findings.push(Finding::AddressMatch(e.name.clone())),
        }
    }
    for name in deployed.keys() {
        if !entries.iter().any(|e| e.name == *name) {
            findings.push(Finding::MissingInCsv(name.to_string()));
        }
    }
    for e in entries {
        let Some((_, presalt)) = deployed.get(e.name.as_str()) else {
            continue;
        };
        if *presalt != e.presalt {
            findings.push(Finding::PresaltMismatch {
                name: e.name.clone(),
                csv: e.presalt.clone(),
                book: presalt.clone(),
            })
        } else {
            findings.push(Finding::PresaltMatch(e.name.clone()))
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContractRecord, ContractType};
    use alloy_primitives::address;

    fn book() -> AddressBook {
        let mut hub = ContractRecord::new("ActionHub", ContractType::Aux);
        hub.address = Some(address!("0x00000000000000000000000000000000000000aa"));
        hub.lens_create2_pre_salt = Some("lens.contract.ActionHub".into());
        let mut fees = ContractRecord::new("LensFees", ContractType::Aux);
        fees.address = Some(address!("0x00000000000000000000000000000000000000bb"));
        fees.lens_create2_pre_salt = Some("lens.contract.LensFees".into());
        let mut extra = ContractRecord::new("Extra", ContractType::Misc);
        extra.address = Some(address!("0x00000000000000000000000000000000000000cc"));
        [
            ("ActionHub".to_string(), hub),
            ("LensFees".to_string(), fees),
            ("Extra".to_string(), extra),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parse() {
        let csv = "ContractName,Address,PreSalt\nA,0x01,lens.contract.A\n\nB,0x02,\n";
        let entries = parse_create2_csv(csv).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].presalt.as_deref(), Some("lens.contract.A"));
        assert_eq!(entries[1].presalt, None);
        assert_eq!(parse_create2_csv(""), Err(CsvError::Empty));
        assert_eq!(
            parse_create2_csv("Name,Address\n"),
            Err(CsvError::MissingColumn("ContractName"))
        );
    }

    #[test]
    fn findings() {
        let csv = "ContractName,Address,PreSalt\n\
                   ActionHub,0x00000000000000000000000000000000000000AA,lens.contract.ActionHub\n\
                   LensFees,0x00000000000000000000000000000000000000b0,lens.contract.Fees\n\
                   Unknown,0x01,lens.contract.Unknown\n";
        let entries = parse_create2_csv(csv).unwrap();
        let f = compare_create2(&entries, &book());
        assert_eq!(f[0], Finding::AddressMatch("ActionHub".into()));
        assert!(matches!(&f[1], Finding::AddressMismatch { name, .. } if name == "LensFees"));
        assert_eq!(f[2], Finding::MissingInBook("Unknown".into()));
        assert_eq!(f[3], Finding::MissingInCsv("Extra".into()));
        assert_eq!(f[4], Finding::PresaltMatch("ActionHub".into()));
        assert_eq!(
            f[5],
            Finding::PresaltMismatch {
                name: "LensFees".into(),
                csv: Some("lens.contract.Fees".into()),
                book: Some("lens.contract.LensFees".into()),
            }
        );
        assert_eq!(f.len(), 6);
        assert_eq!(f.iter().filter(|x| x.is_problem()).count(), 3);
    }
}
