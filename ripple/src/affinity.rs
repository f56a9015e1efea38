//! CPU pinning for processor threads.
//!
//! ```rust,ignore
//! use ripple::affinity::pin_to_cpu;
//! pin_to_cpu(2)?; // Pin the calling thread to core 2
//! ```

use crate::error::{ Result, RippleError };

/// Pin the calling thread to a single CPU core.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu_id: usize) -> Result<()> {
    use libc::{ cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO };
    use std::mem;

    if cpu_id >= (libc::CPU_SETSIZE as usize) {
        return Err(RippleError::system_resource(format!("CPU id {} out of range", cpu_id)));
    }

    unsafe {
        let mut cpu_set: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpu_set);
        CPU_SET(cpu_id, &mut cpu_set);

        if sched_setaffinity(0, mem::size_of::<cpu_set_t>(), &cpu_set) != 0 {
            return Err(
                RippleError::system_resource(
                    format!("Failed to set CPU affinity: {}", std::io::Error::last_os_error())
                )
            );
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu_id: usize) -> Result<()> {
    Ok(())
}

/// Number of cores the calling process may run on (at least 1).
pub fn available_cores() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_cores() {
        assert!(available_cores() >= 1);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_pin_out_of_range() {
        let err = pin_to_cpu(usize::MAX).unwrap_err();
        assert!(matches!(err, RippleError::SystemResource { .. }));
    }

    #[cfg(target_os = "linux")]
    fn current_affinity() -> Vec<usize> {
        use libc::{ cpu_set_t, sched_getaffinity, CPU_ISSET, CPU_SETSIZE };

        unsafe {
            let mut cpu_set: cpu_set_t = std::mem::zeroed();
            assert_eq!(sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut cpu_set), 0);
            (0..CPU_SETSIZE as usize).filter(|&cpu| CPU_ISSET(cpu, &cpu_set)).collect()
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_pin_current_thread() {
        std::thread
            ::spawn(|| {
                // First core this process is allowed on, which need not be core 0
                let cpu = current_affinity()[0];
                pin_to_cpu(cpu).unwrap();
                assert_eq!(current_affinity(), vec![cpu]);
            })
            .join()
            .unwrap();
    }
}
