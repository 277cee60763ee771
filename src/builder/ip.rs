//! Looking up a VM's IP address.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::lume::{Invocation, Lume};

/// Seconds `lume ip --wait` may block inside the tool.
pub const IP_WAIT_SECS: u64 = 120;

/// Fixed delay before the query, run in the same subprocess.
pub const IP_PRE_DELAY_SECS: u64 = 120;

/// The `lume ip` invocation for `vm_name`.
pub fn ip_invocation(vm_name: &str, extra_args: &[String], pre_delay_secs: u64) -> Invocation {
    let mut args = vec![
        "ip".to_string(),
        "--wait".to_string(),
        IP_WAIT_SECS.to_string(),
        vm_name.to_string(),
    ];
    args.extend(extra_args.iter().cloned());
    Invocation::delayed(args, pre_delay_secs)
}

/// Wait for `vm_name` to report an IP address.
///
/// Blocks for the fixed pre-delay plus however long lume waits. Returns the
/// trimmed output of `lume ip`.
pub fn wait_for_ip(
    lume: &Lume,
    ctx: &CancelToken,
    vm_name: &str,
    extra_args: &[String],
) -> Result<String> {
    query_ip(lume, ctx, vm_name, extra_args, IP_PRE_DELAY_SECS)
}

pub(crate) fn query_ip(
    lume: &Lume,
    ctx: &CancelToken,
    vm_name: &str,
    extra_args: &[String],
    pre_delay_secs: u64,
) -> Result<String> {
    let invocation = ip_invocation(vm_name, extra_args, pre_delay_secs);
    lume.execute(ctx, &invocation, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::lume::tests::fake_lume;

    #[test]
    fn test_ip_invocation() {
        let inv = ip_invocation("vm1", &[], IP_PRE_DELAY_SECS);
        assert_eq!(inv.args, ["ip", "--wait", "120", "vm1"]);
        assert_eq!(inv.delay_secs, 120);

        let inv = ip_invocation("vm1", &["--resolver".to_string(), "arp".to_string()], 0);
        assert_eq!(inv.args, ["ip", "--wait", "120", "vm1", "--resolver", "arp"]);
        assert_eq!(inv.delay_secs, 0);
    }

    #[test]
    fn test_query_returns_trimmed_address() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "[ \"$4\" = vm1 ] && echo ' 192.168.64.7'\n");

        let ip = query_ip(&lume, &CancelToken::new(), "vm1", &[], 0).unwrap();
        assert_eq!(ip, "192.168.64.7");
    }

    #[test]
    fn test_query_failure() {
        let dir = tempfile::tempdir().unwrap();
        let lume = fake_lume(dir.path(), "echo 'timed out waiting for IP' >&2\nexit 1\n");

        let err = query_ip(&lume, &CancelToken::new(), "vm1", &[], 0).unwrap_err();
        assert_eq!(err.to_string(), "timed out waiting for IP");
        assert!(matches!(err, Error::Lume(_)));
    }
}
