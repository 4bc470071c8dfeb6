use ryzen_telemetry::decode::pm_table::CoreArray;
use ryzen_telemetry::{Session, TelemetryResult};
use std::thread;
use std::time::Duration;

fn opt(v: Option<f32>, unit: &str) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.2} {unit}"))
}

fn print_cores(label: &str, cores: &CoreArray, unit: &str) {
    if cores.is_empty() {
        return;
    }
    print!("    {label:<14}");
    for v in cores.as_slice() {
        print!(" {v:>6.1}");
    }
    println!(" {unit}");
}

fn main() -> TelemetryResult<()> {
    println!("============================================================");
    println!("              Ryzen SMU - PM Table Metrics                  ");
    println!("============================================================");

    println!("[+] Opening ryzen_smu driver...");
    let mut session = match Session::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[-] {e}");
            eprintln!("    (Ensure the 'ryzen_smu' kernel module is loaded and you are root)");
            return Err(e);
        }
    };

    // Usage is a delta, so prime the counters first.
    session.poll()?;
    thread::sleep(Duration::from_millis(500));
    let s = session.poll()?;

    println!("    Codename:      {}", s.codename);
    println!("    SMU Version:   {}", s.smu_version.as_deref().unwrap_or("n/a"));
    println!("    PM Table:      0x{:08X}", s.pm_table_version);

    let m = &s.metrics;
    println!("\n[+] Power");
    println!("    Package:       {}", opt(m.package_power_w, "W"));
    println!("    PPT:           {}", opt(m.ppt_w, "W"));
    println!("    Current:       {}", opt(m.package_current_a, "A"));

    println!("\n[+] Voltages");
    println!("    VCore:         {:.4} V", m.vcore);
    println!("    VSoC:          {:.4} V", m.vsoc);
    println!("    VDDP:          {:.4} V", m.vddp);
    println!("    VDDG CCD/IOD:  {:.4} / {:.4} V", m.vddg_ccd, m.vddg_iod);
    println!("    VID:           {}", opt(m.vid, "V"));

    println!("\n[+] Clocks");
    println!("    Core (max):    {}", opt(m.core_clock_mhz, "MHz"));
    println!(
        "    FCLK/UCLK/MCLK: {:.0} / {:.0} / {:.0} MHz",
        m.fclk_mhz, m.uclk_mhz, m.mclk_mhz
    );

    println!("    BCLK:          {}", opt(m.bclk_mhz, "MHz"));

    println!("\n[+] Temperatures");
    println!("    CPU:           {}", opt(m.cpu_temp_c, "C"));
    println!("    Tdie:          {}", opt(m.tdie_c, "C"));
    println!("    IOD Hotspot:   {}", opt(m.iod_hotspot_c, "C"));

    println!("\n[+] Per Core");
    print_cores("Clock", &m.core_clocks_ghz, "GHz");
    print_cores("Temp", &m.core_temps_c, "C");
    print_cores("Voltage", &m.core_voltages, "V");
    print_cores("Usage", &m.core_usage_pct, "%");
    print_cores("Freq", &m.core_freq_mhz, "MHz");

    println!("\n[+] Memory");
    println!("    Type:          {}", s.memory_type);
    println!("    Frequency:     {}", opt(s.memory_frequency_mhz, "MHz"));

    if let Some(agesa) = session.agesa_version() {
        println!("    AGESA:         {agesa}");
    }

    Ok(())
}
