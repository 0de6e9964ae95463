use std::path::Path;

use console::Style;
use serview_core::Session;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_file_summary(path: &Path, session: &Session) {
    let s = Styles::new();
    let meta = session.metadata();

    println!();
    println!("  {}", s.title.apply_to("SER File"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(8)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("File"),
        s.path.apply_to(path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(meta.frame_count)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Dimensions"),
        s.value.apply_to(format!("{}x{}", meta.width, meta.height))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Bit depth"),
        s.value.apply_to(meta.pixel_depth)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Byte order"),
        s.value.apply_to(format!("{:?} (flag {})", meta.endianness, meta.endian_flag))
    );
    println!();

    println!("  {}", s.header.apply_to("Color"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Declared"),
        s.value.apply_to(meta.color_format)
    );
    let effective = session.effective_format();
    if effective != meta.color_format {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Decoded as"),
            s.method.apply_to(effective)
        );
    }
    if effective.needs_demosaic() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Demosaic"),
            s.method.apply_to(session.demosaic_strategy())
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Capture"));
    for (label, value) in [
        ("Observer", meta.observer()),
        ("Instrument", meta.instrument()),
        ("Telescope", meta.telescope()),
    ] {
        match value {
            Some(v) => println!("    {:<12}{}", s.label.apply_to(label), s.value.apply_to(v)),
            None => println!(
                "    {:<12}{}",
                s.label.apply_to(label),
                s.disabled.apply_to("unknown")
            ),
        }
    }
    let (local, utc) = session.capture_times();
    for (label, value) in [("Local time", local), ("UTC time", utc)] {
        match value {
            Some(t) => println!(
                "    {:<12}{}",
                s.label.apply_to(label),
                s.value.apply_to(t.format("%Y-%m-%d %H:%M:%S%.3f"))
            ),
            None => println!(
                "    {:<12}{}",
                s.label.apply_to(label),
                s.disabled.apply_to("not recorded")
            ),
        }
    }
    println!();

    println!("  {}", s.header.apply_to("Layout"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Frame size"),
        s.value.apply_to(format!("{} bytes", meta.frame_byte_size()))
    );
    let total_mb = (meta.frame_byte_size() * meta.frame_count()) as f64 / (1024.0 * 1024.0);
    println!(
        "    {:<12}{}",
        s.label.apply_to("Data size"),
        s.value.apply_to(format!("{total_mb:.1} MB"))
    );
    if meta.has_timestamps {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Timestamps"),
            s.method.apply_to("present")
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Timestamps"),
            s.disabled.apply_to("absent")
        );
    }
    println!();
}
