//! Check command implementation.
//!
//! Validates system requirements and configuration.

use crate::config::{validate_effective_config, Config};
use crate::process::scanner::collect_proc_entries;
use crate::process::{discover_archive_processes, ArchiveTool};
use crate::startup_checks::{check_io_accounting, check_proc_mounted, check_user_privileges};

/// Runs every diagnostic and prints a report. Returns whether all checks passed.
pub fn command_check(tools: bool, config: &Config) -> Result<bool, Box<dyn std::error::Error>> {
    let proc_root = config.proc_root();

    println!("🔍 zprogress - System Check");
    println!("===========================");

    let mut all_ok = true;

    println!("\n📁 Checking {} filesystem...", proc_root.display());
    match check_proc_mounted(&proc_root) {
        Ok(()) => {
            let entries = collect_proc_entries(&proc_root);
            if entries.is_empty() {
                println!("   ❌ Cannot read any process entries");
                all_ok = false;
            } else {
                println!("   ✅ Can read {} process entries", entries.len());
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n💾 Checking I/O accounting...");
    match check_io_accounting(&proc_root) {
        Ok(()) => println!("   ✅ rchar/wchar counters readable"),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n👤 Checking privileges...");
    if check_user_privileges() {
        println!("   ✅ Running as root - all processes visible");
    } else {
        println!("   ⚠️  Not root - only your own processes can be monitored");
    }

    if tools {
        println!("\n🧰 Checking installed tools...");
        for tool in ArchiveTool::ALL {
            match which::which(tool.name()) {
                Ok(path) => println!("   ✅ {:<7} {}", tool.name(), path.display()),
                Err(_) => println!("   ➖ {:<7} not found on PATH", tool.name()),
            }
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(()) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    let running = discover_archive_processes(&proc_root);
    println!("\n📊 Archive processes running: {}", running.len());
    for candidate in &running {
        println!("   PID {:<7} {}", candidate.pid, candidate.tool);
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
    } else {
        println!("   ❌ Some checks failed - please review the output above");
    }
    Ok(all_ok)
}
