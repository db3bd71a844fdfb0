//! Derivation of build variables from located toolchain facts.

use crate::graph::Variable;
use crate::platform::Platform;
use crate::toolchain::ToolchainInfo;

/// Turn toolchain facts into the ordered settings-block variables.
///
/// Every variable is overridable: a caller-supplied value wins over the
/// derived default under the target format's `?=` semantics.
#[must_use]
pub fn derive(toolchain: &ToolchainInfo, platform: &Platform) -> Vec<Variable> {
    vec![
        Variable::overridable("PREFIX", format!("\"{}\"", forward_slashes(toolchain.root.as_str()))),
        Variable::overridable(
            "ARMGNU",
            format!("\"$(PREFIX)/bin/{}\"", toolchain.prefix),
        ),
        Variable::overridable(
            "SUFFIX",
            if toolchain.has_exe_suffix { ".exe" } else { "" },
        ),
        Variable::overridable(
            "POSIX",
            if platform.is_posix_shell() { "true" } else { "false" },
        ),
    ]
}

/// Normalise path separators to forward slashes.
#[must_use]
pub fn forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn toolchain() -> ToolchainInfo {
        ToolchainInfo {
            root: "C:/tools/yagarto".into(),
            bin_dir: "C:/tools/yagarto/bin".into(),
            prefix: "arm-none-eabi".into(),
            has_exe_suffix: true,
            name: "yagarto".into(),
        }
    }

    #[rstest]
    fn derives_ordered_overridable_variables() {
        let platform = Platform::new(false, "/nowhere");
        let variables = derive(&toolchain(), &platform);
        let rendered: Vec<(String, String)> = variables
            .iter()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("PREFIX".into(), "\"C:/tools/yagarto\"".into()),
                ("ARMGNU".into(), "\"$(PREFIX)/bin/arm-none-eabi\"".into()),
                ("SUFFIX".into(), ".exe".into()),
                ("POSIX".into(), "true".into()),
            ]
        );
        assert!(variables.iter().all(|v| v.overridable));
    }

    #[rstest]
    fn empty_suffix_and_non_posix_platform() {
        let mut info = toolchain();
        info.has_exe_suffix = false;
        let platform = Platform::new(true, "/nowhere");
        let variables = derive(&info, &platform);
        assert_eq!(variables[2].value, "");
        assert_eq!(variables[3].value, "false");
    }

    #[rstest]
    #[case::backslashes("C:\\tools\\yagarto", "C:/tools/yagarto")]
    #[case::already_forward("/opt/gcc", "/opt/gcc")]
    fn separator_normalisation(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(forward_slashes(input), expected);
    }
}
