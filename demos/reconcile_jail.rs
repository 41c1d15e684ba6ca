use jailconf::{JailOptions, JailParams, Reconciler};

fn main() -> Result<(), jailconf::Error> {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| std::env::temp_dir().to_string_lossy().into_owned());
    let dry_run = std::env::args().any(|a| a == "--check");

    let mut params = JailParams::new("sshd");
    params.port = Some("ssh".to_string());
    params.logpath = Some("/var/log/auth.log".to_string());
    params.maxretry = Some(3);
    params.bantime = Some("1h".to_string());

    let reconciler = Reconciler::new(JailOptions::with_jail_directory(dir))?;
    let outcome = reconciler.apply(params, dry_run)?;

    println!(
        "{}: succeeded={} changed={} action={:?}",
        outcome.path.display(),
        outcome.succeeded,
        outcome.changed,
        outcome.action
    );
    if let Some(previous) = &outcome.previous {
        println!("previous [{}]: {:?}", previous.section_name, previous.settings);
    }
    if let Some(message) = &outcome.message {
        eprintln!("{message}");
        std::process::exit(1);
    }
    Ok(())
}
