use std::process::Command;

/// A CUPS queue bound to a USB P-touch; it holds the interface we claim.
#[derive(Debug, Clone)]
pub struct CupsQueue {
    pub name: String,
    pub uri: String,
}

pub fn check_usb_access() -> Vec<String> {
    detect_ptouch_queues()
        .into_iter()
        .map(|q| {
            format!(
                "CUPS conflict: \"{}\" is claiming USB. \
                 Remove it from System Settings > Printers & Scanners, \
                 or run: lpadmin -x {}",
                q.name, q.name
            )
        })
        .collect()
}

pub fn detect_ptouch_queues() -> Vec<CupsQueue> {
    let output = match Command::new("lpstat").arg("-v").output() {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!("lpstat not available: {e}");
            return Vec::new();
        }
    };

    // "No destinations added" exits 1 and is not a problem
    if !output.status.success() {
        return Vec::new();
    }

    parse_lpstat_output(&String::from_utf8_lossy(&output.stdout))
}

/// `lpstat -v` prints `device for <name>: <uri>` per queue; keep USB
/// queues that point at a Brother P-touch.
fn parse_lpstat_output(output: &str) -> Vec<CupsQueue> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("device for "))
        .filter_map(|rest| rest.split_once(": "))
        .map(|(name, uri)| CupsQueue {
            name: name.trim().to_string(),
            uri: uri.trim().to_string(),
        })
        .filter(|q| {
            let uri = q.uri.to_lowercase();
            uri.starts_with("usb://") && uri.contains("brother") && uri.contains("pt-")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_ptouch_queue_detected() {
        let output = "device for PT2430: usb://Brother/PT-2430PC?serial=A1B2C3\n";
        let queues = parse_lpstat_output(output);
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].name, "PT2430");
    }

    #[test]
    fn other_printers_ignored() {
        let output = "\
device for HP_LaserJet: ipp://192.168.1.100/ipp/print
device for Brother_HL: usb://Brother/HL-L2350DW?serial=X
device for PT1230: usb://Brother/PT-1230PC?serial=Y
";
        let queues = parse_lpstat_output(output);
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].name, "PT1230");
    }

    #[test]
    fn empty_output() {
        assert!(parse_lpstat_output("").is_empty());
    }
}
