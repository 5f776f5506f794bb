// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Environment probes backed by Linux sysfs and procfs.
//!
//! Reads files directly instead of shelling out to `sensors`. Both roots are
//! configurable so tests can point the probe at a fake tree.

use std::fs;
use std::path::{Path, PathBuf};

use sdc_core::{EnvironmentProbe, ProbeError};
use tracing::debug;

/// hwmon labels tried in order: Intel per-core, Intel package, AMD k10temp.
const PREFERRED_LABELS: [&str; 3] = ["Core 0", "Package id 0", "Tctl"];

/// Reads core temperature from hwmon (or the first thermal zone) and the
/// current clock from `/proc/cpuinfo`.
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    sys_root: PathBuf,
    proc_root: PathBuf,
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsProbe {
    /// Probe rooted at `/sys` and `/proc`.
    pub fn new() -> Self {
        Self::with_roots("/sys", "/proc")
    }

    /// Probe rooted elsewhere.
    pub fn with_roots(sys_root: impl Into<PathBuf>, proc_root: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
            proc_root: proc_root.into(),
        }
    }

    fn hwmon_millidegrees(&self) -> Option<i64> {
        let mut candidates: Vec<(usize, PathBuf)> = Vec::new();
        for hwmon in sorted_dir(&self.sys_root.join("class/hwmon")) {
            for entry in sorted_dir(&hwmon) {
                let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(stem) = name.strip_suffix("_label") else {
                    continue;
                };
                let Ok(label) = fs::read_to_string(&entry) else {
                    continue;
                };
                if let Some(rank) = PREFERRED_LABELS.iter().position(|l| *l == label.trim()) {
                    candidates.push((rank, hwmon.join(format!("{stem}_input"))));
                }
            }
        }
        candidates.sort_by_key(|(rank, _)| *rank);
        candidates
            .into_iter()
            .find_map(|(_, input)| read_integer(&input))
    }

    fn thermal_zone_millidegrees(&self) -> Option<i64> {
        read_integer(&self.sys_root.join("class/thermal/thermal_zone0/temp"))
    }
}

impl EnvironmentProbe for SysfsProbe {
    fn temperature(&self) -> Result<String, ProbeError> {
        let millis = self
            .hwmon_millidegrees()
            .or_else(|| {
                debug!("no labelled hwmon sensor; trying thermal_zone0");
                self.thermal_zone_millidegrees()
            })
            .ok_or_else(|| ProbeError::Unavailable("no readable temperature sensor".into()))?;
        Ok(format_celsius(millis))
    }

    fn frequency_mhz(&self) -> Result<String, ProbeError> {
        let path = self.proc_root.join("cpuinfo");
        let cpuinfo = fs::read_to_string(&path)
            .map_err(|err| ProbeError::Unavailable(format!("{}: {err}", path.display())))?;
        parse_cpu_mhz(&cpuinfo)
            .ok_or_else(|| ProbeError::Unavailable("no `cpu MHz` line in cpuinfo".into()))
    }
}

/// Probe with no sources. Every reading is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl EnvironmentProbe for NullProbe {
    fn temperature(&self) -> Result<String, ProbeError> {
        Err(ProbeError::Unavailable("probing disabled".into()))
    }

    fn frequency_mhz(&self) -> Result<String, ProbeError> {
        Err(ProbeError::Unavailable("probing disabled".into()))
    }
}

fn sorted_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    paths
}

fn read_integer(path: &Path) -> Option<i64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// First `cpu MHz` value, integer part only.
fn parse_cpu_mhz(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("cpu MHz"))
        .find_map(|line| line.split_once(':'))
        .map(|(_, value)| value.trim())
        .and_then(|value| value.split('.').next())
        .filter(|whole| !whole.is_empty())
        .map(str::to_owned)
}

/// `51234` → `+51.2°C`, matching the `sensors` rendering.
fn format_celsius(millis: i64) -> String {
    let sign = if millis < 0 { '-' } else { '+' };
    let abs = millis.unsigned_abs();
    format!("{sign}{}.{}°C", abs / 1000, (abs % 1000) / 100)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CPUINFO: &str = "processor\t: 0\nvendor_id\t: GenuineIntel\n\
cpu MHz\t\t: 3392.147\ncache size\t: 8192 KB\n\nprocessor\t: 1\ncpu MHz\t\t: 800.000\n";

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn celsius_rendering() {
        assert_eq!(format_celsius(51_234), "+51.2°C");
        assert_eq!(format_celsius(9_000), "+9.0°C");
        assert_eq!(format_celsius(-500), "-0.5°C");
    }

    #[test]
    fn cpu_mhz_takes_first_integer_part() {
        assert_eq!(parse_cpu_mhz(CPUINFO).as_deref(), Some("3392"));
        assert_eq!(parse_cpu_mhz("model name\t: arm\n"), None);
    }

    #[test]
    fn prefers_core0_over_package() {
        let sys = TempDir::new().unwrap();
        write(sys.path(), "class/hwmon/hwmon1/temp1_label", "Package id 0\n");
        write(sys.path(), "class/hwmon/hwmon1/temp1_input", "60000\n");
        write(sys.path(), "class/hwmon/hwmon1/temp2_label", "Core 0\n");
        write(sys.path(), "class/hwmon/hwmon1/temp2_input", "47500\n");
        let probe = SysfsProbe::with_roots(sys.path(), sys.path());
        assert_eq!(probe.temperature().unwrap(), "+47.5°C");
    }

    #[test]
    fn falls_back_to_thermal_zone() {
        let sys = TempDir::new().unwrap();
        write(sys.path(), "class/hwmon/hwmon0/temp1_label", "acpitz\n");
        write(sys.path(), "class/hwmon/hwmon0/temp1_input", "30000\n");
        write(sys.path(), "class/thermal/thermal_zone0/temp", "42000\n");
        let probe = SysfsProbe::with_roots(sys.path(), sys.path());
        assert_eq!(probe.temperature().unwrap(), "+42.0°C");
    }

    #[test]
    fn missing_sources_are_unavailable_not_fatal() {
        let empty = TempDir::new().unwrap();
        let probe = SysfsProbe::with_roots(empty.path(), empty.path());
        assert!(matches!(probe.temperature(), Err(ProbeError::Unavailable(_))));
        assert!(matches!(probe.frequency_mhz(), Err(ProbeError::Unavailable(_))));
        let sample = probe.sample();
        assert_eq!(sample.temperature, None);
        assert_eq!(sample.frequency_mhz, None);
    }

    #[test]
    fn reads_frequency_from_proc() {
        let proc_root = TempDir::new().unwrap();
        write(proc_root.path(), "cpuinfo", CPUINFO);
        let probe = SysfsProbe::with_roots("/nonexistent", proc_root.path());
        assert_eq!(probe.frequency_mhz().unwrap(), "3392");
    }

    #[test]
    fn null_probe_reads_nothing() {
        let sample = NullProbe.sample();
        assert_eq!(sample.temperature, None);
        assert_eq!(sample.frequency_mhz, None);
    }
}
