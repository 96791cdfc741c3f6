pub fn print_banner() {
    let banner = r#"
  _  _ ___ _____ _    ___ _  _ ___
 | \| | __|_   _| |  | __| \| / __|
 | .` | _|  | | | |__| _|| .` \__ \
 |_|\_|___| |_| |____|___|_|\_|___/
"#;
    println!(
        "{}",
        console::style(banner).cyan().bold()
    );
    println!(
        "  {} v{}\n",
        console::style("connection-table risk analyzer").dim(),
        netlens_core::VERSION
    );
}
