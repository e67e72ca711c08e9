// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reboot-and-probe recovery loop (§4.D "Recovery protocol").

use autophone_adapters::DeviceDriver;
use autophone_core::{PhoneConfig, WorkerTuning};
use tokio::time::Instant;

/// Outcome of a recovery attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Recovered,
    GaveUp { attempts: u32 },
}

/// Reboots `phone` up to `tuning.max_reboot_attempts` times, waiting up to
/// `tuning.max_reboot_wait` after each reboot for the on-device SUT agent to
/// answer again, polling every `tuning.reboot_probe_interval`.
pub async fn recover(
    driver: &dyn DeviceDriver,
    phone: &PhoneConfig,
    tuning: &WorkerTuning,
) -> RecoveryOutcome {
    let mut attempts = 0;
    loop {
        if attempts >= tuning.max_reboot_attempts {
            return RecoveryOutcome::GaveUp { attempts };
        }
        attempts += 1;

        if let Err(e) = driver.reboot_adb(&phone.serial).await {
            tracing::warn!(
                phone_id = %phone.phone_id,
                attempt = attempts,
                error = %e,
                "reboot command failed"
            );
        }

        let deadline = Instant::now() + tuning.max_reboot_wait;
        loop {
            if driver.sut_socket_opens(&phone.ip, phone.sut_cmd_port).await {
                return RecoveryOutcome::Recovered;
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(tuning.reboot_probe_interval).await;
        }

        tracing::warn!(
            phone_id = %phone.phone_id,
            attempt = attempts,
            "device did not come back up within reboot wait window"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autophone_adapters::FakeDeviceDriver;
    use std::time::Duration;

    fn phone() -> PhoneConfig {
        PhoneConfig {
            phone_id: "aa_bb_nexus4".to_string(),
            serial: "SERIAL1".to_string(),
            ip: "10.0.0.5".to_string(),
            sut_cmd_port: 20701,
            machine_type: "nexus4".to_string(),
            os_version: "6.0".to_string(),
        }
    }

    fn fast_tuning() -> WorkerTuning {
        WorkerTuning {
            idle_probe_timeout: Duration::from_millis(10),
            inter_test_sleep: Duration::from_millis(1),
            max_reboot_attempts: 3,
            max_reboot_wait: Duration::from_millis(20),
            reboot_probe_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn recovers_on_first_successful_probe() {
        let driver = FakeDeviceDriver::default();
        driver.set_sut_socket_opens(true);
        let outcome = recover(&driver, &phone(), &fast_tuning()).await;
        assert_eq!(outcome, RecoveryOutcome::Recovered);
        assert_eq!(
            driver
                .call_log()
                .iter()
                .filter(|c| matches!(c, autophone_adapters::DriverCall::RebootAdb { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_when_socket_never_opens() {
        let driver = FakeDeviceDriver::default();
        driver.set_sut_socket_opens(false);
        let outcome = recover(&driver, &phone(), &fast_tuning()).await;
        assert_eq!(outcome, RecoveryOutcome::GaveUp { attempts: 3 });
        let reboots = driver
            .call_log()
            .iter()
            .filter(|c| matches!(c, autophone_adapters::DriverCall::RebootAdb { .. }))
            .count();
        assert_eq!(reboots, 3);
    }
}
