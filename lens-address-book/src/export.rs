//! Derived outputs: the `contracts.env` file and the address CSV.

use crate::{AddressBook, ContractType};

/// Env-file sections in output order.
const SECTIONS: [(ContractType, &str); 9] = [
    (ContractType::Factory, "FACTORIES"),
    (ContractType::Implementation, "IMPLEMENTATIONS"),
    (ContractType::Beacon, "BEACONS"),
    (ContractType::Primitive, "LENS GLOBAL PRIMITIVES"),
    (ContractType::Aux, "AUX"),
    (ContractType::Action, "ACTIONS"),
    (ContractType::Rule, "RULES"),
    (ContractType::Misc, "MISC"),
    (ContractType::Address, "CONSTANTS / ADDRESSES"),
];

/// Environment variable name for a logical contract name.
pub fn env_var_name(name: &str) -> String {
    match name {
        "LensGlobalFeed" => return "GLOBAL_FEED".into(),
        "LensGlobalGraph" => return "GLOBAL_GRAPH".into(),
        "LensGlobalNamespace" => return "LENS_NAMESPACE".into(),
        _ => {}
    }
    let mut out = String::with_capacity(name.len() + 8);
    let mut prev_lower = false;
    for c in name.chars() {
        if prev_lower && c.is_ascii_uppercase() {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase();
        out.push(c.to_ascii_uppercase());
    }
    out
}

/// Render `NAME="address"` lines grouped by contract type.
///
/// The factory section is always present; every other section only when it
/// has entries. Records without an address are left out.
pub fn render_env(book: &AddressBook) -> String {
    let mut out = String::new();
    for (ty, title) in SECTIONS {
        let lines = book
            .iter()
            .filter(|(_, r)| r.contract_type == ty)
            .filter_map(|(name, r)| r.address.map(|a| format!("{}=\"{a}\"", env_var_name(name))))
            .collect::<Vec<_>>();
        if lines.is_empty() && ty != ContractType::Factory {
            continue;
        }
        out.push_str("# ");
        out.push_str(title);
        out.push('\n');
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
    out
}

/// Render a `Contract,Address` CSV of the whole book.
pub fn render_csv(book: &AddressBook) -> String {
    let mut csv = String::from("Contract,Address\n");
    for (name, r) in book {
        let addr = r.address.map(|a| a.to_string()).unwrap_or_default();
        csv.push_str(&format!("{name},{addr}\n"));
    }
    csv
}
