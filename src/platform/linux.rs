use std::fs;
use std::path::Path;

use crate::printer::models::BROTHER_VENDOR_ID;

const UDEV_RULES_DIR: &str = "/etc/udev/rules.d";

pub fn check_usb_access() -> Vec<String> {
    let mut warnings = Vec::new();

    if !has_brother_rule(Path::new(UDEV_RULES_DIR)) {
        warnings.push(format!(
            "Linux: no udev rule for vendor {BROTHER_VENDOR_ID:04x} in {UDEV_RULES_DIR}. \
             Printing may require root."
        ));
    }

    if let Ok(output) = std::process::Command::new("id").arg("-Gn").output() {
        let groups = String::from_utf8_lossy(&output.stdout);
        if !in_printer_group(&groups) {
            warnings.push(
                "Linux: Current user not in 'plugdev' or 'lp' group. \
                 USB printer access may require group membership."
                    .to_string(),
            );
        }
    }

    warnings
}

fn has_brother_rule(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    let needle = format!("{BROTHER_VENDOR_ID:04x}");
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rules"))
        .filter_map(|e| fs::read_to_string(e.path()).ok())
        .any(|rules| rule_matches_vendor(&rules, &needle))
}

fn rule_matches_vendor(rules: &str, vendor: &str) -> bool {
    rules
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .any(|l| l.contains("idVendor") && l.to_ascii_lowercase().contains(vendor))
}

fn in_printer_group(groups: &str) -> bool {
    groups
        .split_whitespace()
        .any(|g| g == "plugdev" || g == "lp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_rule_detected() {
        let rules = r#"SUBSYSTEM=="usb", ATTRS{idVendor}=="04F9", ATTRS{idProduct}=="202d", MODE="0666""#;
        assert!(rule_matches_vendor(rules, "04f9"));
    }

    #[test]
    fn commented_rule_ignored() {
        let rules = r#"# ATTRS{idVendor}=="04f9""#;
        assert!(!rule_matches_vendor(rules, "04f9"));
    }

    #[test]
    fn group_membership() {
        assert!(in_printer_group("alice wheel lp"));
        assert!(!in_printer_group("alice wheel lpadmin"));
    }

    #[test]
    fn missing_rules_dir_has_no_rule() {
        assert!(!has_brother_rule(Path::new("/nonexistent/rules.d")));
    }
}
