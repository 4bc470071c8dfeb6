use ryzen_telemetry::decode::aod::AodField;
use ryzen_telemetry::{Session, TelemetryError, TelemetryResult};
use std::env;

fn mv(v: Option<u32>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v} mV ({:.3} V)", f64::from(v) / 1000.0))
}

fn main() -> TelemetryResult<()> {
    println!("============================================================");
    println!("              AMD Overclocking Data - Memory Rails          ");
    println!("============================================================");

    let session = Session::from_env()?;

    println!("[+] Searching SSDTs in {}", session.config().acpi_tables_path.display());
    let region = match session.locate_aod() {
        Ok(r) => r,
        Err(TelemetryError::RegionNotFound) => {
            eprintln!("[-] No AOD OperationRegion on this firmware");
            return Err(TelemetryError::RegionNotFound);
        }
        Err(e) => return Err(e),
    };
    println!("    AODE:          0x{:x} ({} bytes)", region.phys_addr, region.size);

    let v = session.read_aod_voltages()?;
    println!("\n[+] Memory Rails");
    println!("    MEM VDDIO:     {}", mv(v.mem_vddio_mv));
    println!("    MEM VDDQ:      {}", mv(v.mem_vddq_mv));
    println!("    MEM VPP:       {}", mv(v.mem_vpp_mv));

    if env::args().any(|a| a == "--scan") {
        println!("\n[+] Candidate millivolt values");
        for c in session.scan_aod_voltages()? {
            println!("    0x{:04X} [{}] {} mV", c.offset, c.field.name(), c.millivolts);
        }
    }

    if env::args().any(|a| a == "--raw") {
        for field in [AodField::Outb, AodField::Wcns] {
            let span = field.span();
            println!("\n[+] {} (0x{:04X}, {} bytes)", field.name(), span.start, span.len());
            for row in session.dump_aod_field(field)? {
                let words: Vec<String> = row.words.iter().map(|w| format!("{w:08X}")).collect();
                println!("    {:04X}: {}", row.offset, words.join(" "));
            }
        }
    }

    Ok(())
}
