//! Export of the hosts currently classified `Direct`.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::table::RuleTable;

/// Direct hosts, sorted.
pub fn direct_hosts(table: &RuleTable) -> Vec<String> {
    let mut hosts = table.export_direct();
    hosts.sort_unstable();
    hosts
}

/// Direct hosts as a rule list, one per line, loadable with
/// [`load_rules`](crate::loader::load_rules).
pub fn render_direct_list(table: &RuleTable) -> String {
    let mut out = String::new();
    for host in direct_hosts(table) {
        out.push_str(&host);
        out.push('\n');
    }
    out
}

/// Write the direct host list to a file, replacing it.
pub fn write_direct_list(table: &RuleTable, path: impl AsRef<Path>) -> Result<usize> {
    let hosts = direct_hosts(table);
    let mut out = hosts.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    fs::write(path.as_ref(), out)?;
    Ok(hosts.len())
}

/// Direct hosts as a sorted JSON array, e.g. for embedding in a PAC script.
pub fn direct_hosts_json(table: &RuleTable) -> String {
    serde_json::Value::from(direct_hosts(table)).to_string()
}
