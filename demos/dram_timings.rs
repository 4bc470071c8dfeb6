use ryzen_telemetry::decode::dram::{self, DramGeneration};
use ryzen_telemetry::{Session, TelemetryResult};
use std::env;

fn main() -> TelemetryResult<()> {
    println!("============================================================");
    println!("              Ryzen UMC - DRAM Timings (SMN)                ");
    println!("============================================================");

    let mut session = Session::from_env()?;
    let s = session.poll()?;
    let t = &s.timings;

    println!("[+] {} / {}", s.codename, s.memory_type);
    match s.memory_frequency_mhz {
        Some(f) => println!("    Frequency:     {f:.0} MHz"),
        None => println!("    Frequency:     unknown"),
    }

    println!("\n[+] Primary");
    println!(
        "    {}-{}-{}-{}-{}  tRC {}",
        t.tcl, t.trcd_rd, t.trcd_wr, t.trp, t.tras, t.trc
    );
    if let Some(cr) = t.command_rate {
        println!("    Command Rate:  {cr}");
    }
    println!("    GDM:           {}", t.gdm_enabled);
    println!("    Power Down:    {}", t.power_down_enabled);

    println!("\n[+] Secondary");
    println!("    tRRDS/L:       {} / {}", t.trrds, t.trrdl);
    println!("    tFAW:          {}", t.tfaw);
    println!("    tWR / tCWL:    {} / {}", t.twr, t.tcwl);
    println!("    tRTP:          {}", t.rtp);
    println!("    tWTRS/L:       {} / {}", t.wtrs, t.wtrl);
    println!("    tRDWR/tWRRD:   {} / {}", t.rdwr, t.wrrd);
    println!(
        "    RDRD SCL/SC/SD/DD: {} / {} / {} / {}",
        t.rdrd_scl, t.rdrd_sc, t.rdrd_sd, t.rdrd_dd
    );
    println!(
        "    WRWR SCL/SC/SD/DD: {} / {} / {} / {}",
        t.wrwr_scl, t.wrwr_sc, t.wrwr_sd, t.wrwr_dd
    );

    println!("\n[+] Refresh");
    println!("    tREFI:         {} ({:.1} ns)", t.refi, t.trefi_ns);
    println!("    tRFC:          {} ({:.1} ns)", t.rfc, t.trfc_ns);
    println!("    tRFC2:         {} ({:.1} ns)", t.rfc2, t.trfc2_ns);
    println!("    tRFCsb:        {} ({:.1} ns)", t.rfcsb, t.trfcsb_ns);

    // Optional: RYZEN_DRAM_CHANNEL=<n> dumps another UMC channel.
    if let Some(channel) = env::var("RYZEN_DRAM_CHANNEL").ok().and_then(|v| v.parse::<u8>().ok())
        && let Some(generation) = DramGeneration::for_codename(s.codename)
    {
        let c = dram::decode_channel(generation, session.driver(), channel);
        println!("\n[+] Channel {channel}");
        println!(
            "    {}-{}-{}-{}-{}  tRFC {}",
            c.tcl, c.trcd_rd, c.trcd_wr, c.trp, c.tras, c.rfc
        );
    }

    Ok(())
}
