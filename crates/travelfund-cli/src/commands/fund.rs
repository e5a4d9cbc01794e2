use std::path::Path;

use travelfund_core::format_amount;

use super::{open_app, print_json, CliResult};

pub fn spin() -> CliResult {
    let (mut app, _) = open_app()?;
    let mut rng = rand::thread_rng();
    match app.spin(&mut rng)? {
        Some(event) => print_json(&event)?,
        None => eprintln!("no spins available"),
    }
    Ok(())
}

pub fn rewards() -> CliResult {
    let (app, _) = open_app()?;
    print_json(&app.reward_table().tiers())
}

pub fn summary() -> CliResult {
    let (app, _) = open_app()?;
    let summary = app.summary();
    let mut json = serde_json::to_value(&summary)?;
    if let Some(obj) = json.as_object_mut() {
        obj.insert("fund_display".into(), format_amount(summary.fund).into());
        obj.insert(
            "remaining_to_target_display".into(),
            format_amount(summary.remaining_to_target).into(),
        );
    }
    print_json(&json)
}

pub fn export(dir: &Path) -> CliResult {
    let (app, _) = open_app()?;
    let Some(file) = app.export()? else {
        eprintln!("nothing to export: no data has been saved yet");
        return Ok(());
    };
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&file.file_name);
    std::fs::write(&path, &file.contents)?;
    tracing::info!(path = %path.display(), mime = file.mime_type, "backup written");
    println!("{}", path.display());
    Ok(())
}
