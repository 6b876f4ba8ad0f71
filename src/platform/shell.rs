// src/platform/shell.rs

use std::{ffi::OsStr, os::windows::ffi::OsStrExt};

use anyhow::{anyhow, Result};
use tracing::{debug, error};
use windows::{
    core::{PCWSTR, PWSTR},
    Win32::{
        Foundation::CloseHandle,
        System::{
            Diagnostics::ToolHelp::{
                CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
                TH32CS_SNAPPROCESS,
            },
            Threading::{
                CreateProcessW, OpenProcess, TerminateProcess, PROCESS_CREATION_FLAGS,
                PROCESS_INFORMATION, PROCESS_TERMINATE, STARTUPINFOW,
            },
        },
    },
};

use crate::apply::ShellRefresh;

const SHELL_PROCESS: &str = "explorer.exe";
const SHELL_PATH: &str = "C:\\Windows\\explorer.exe";

/// Explorer-backed [`ShellRefresh`]: the orchestrator's bounded retry loop
/// drives these primitives after settings application.
#[derive(Debug, Default)]
pub struct ExplorerShell;

impl ShellRefresh for ExplorerShell {
    fn terminate_shell(&self) -> Result<()> {
        let pids = processes_named(SHELL_PROCESS)?;
        if pids.is_empty() {
            debug!("No running {} to terminate", SHELL_PROCESS);
            return Ok(());
        }
        for pid in pids {
            terminate_process(pid)?;
            debug!("Terminated {} with PID {}", SHELL_PROCESS, pid);
        }
        Ok(())
    }

    fn is_shell_running(&self) -> bool {
        match processes_named(SHELL_PROCESS) {
            Ok(pids) => !pids.is_empty(),
            Err(e) => {
                error!("Failed to snapshot processes: {:?}", e);
                false
            }
        }
    }

    fn launch_shell(&self) -> Result<()> {
        let application_name: Vec<u16> = OsStr::new(SHELL_PATH)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let mut startup_info: STARTUPINFOW = unsafe { std::mem::zeroed() };
        startup_info.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
        let mut process_info: PROCESS_INFORMATION = unsafe { std::mem::zeroed() };

        let result = unsafe {
            CreateProcessW(
                PCWSTR(application_name.as_ptr()),
                PWSTR(std::ptr::null_mut()),
                None,
                None,
                false,
                PROCESS_CREATION_FLAGS(0),
                None,
                None,
                &startup_info,
                &mut process_info,
            )
        };
        if result.is_err() {
            return Err(anyhow!("Failed to start {}", SHELL_PROCESS));
        }

        unsafe {
            if let Err(e) = CloseHandle(process_info.hProcess) {
                error!("Failed to close process handle: {:?}", e);
            }
            if let Err(e) = CloseHandle(process_info.hThread) {
                error!("Failed to close thread handle: {:?}", e);
            }
        }
        Ok(())
    }
}

/// PIDs of every running process with the given executable name.
fn processes_named(exe_name: &str) -> Result<Vec<u32>> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)? };
    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    let mut pids = Vec::new();
    if unsafe { Process32FirstW(snapshot, &mut entry).is_ok() } {
        loop {
            let name_utf16: Vec<u16> = entry
                .szExeFile
                .iter()
                .take_while(|&&c| c != 0)
                .cloned()
                .collect();
            let name = String::from_utf16_lossy(&name_utf16);
            if name.eq_ignore_ascii_case(exe_name) {
                pids.push(entry.th32ProcessID);
            }
            if unsafe { Process32NextW(snapshot, &mut entry).is_err() } {
                break;
            }
        }
    }

    if let Err(e) = unsafe { CloseHandle(snapshot) } {
        error!("Failed to close snapshot handle: {:?}", e);
    }
    Ok(pids)
}

fn terminate_process(pid: u32) -> Result<()> {
    let handle = unsafe { OpenProcess(PROCESS_TERMINATE, false, pid)? };
    let result = unsafe { TerminateProcess(handle, 0) };
    if let Err(e) = unsafe { CloseHandle(handle) } {
        error!("Failed to close process handle: {:?}", e);
    }
    result.map_err(|e| anyhow!("Failed to terminate PID {}: {:?}", pid, e))
}
