// End-to-end checks of the report-monitor binary through a pty
#![cfg(unix)]

use anyhow::Result;
use rexpect::spawn;
use std::fs;

const BIN: &str = env!("CARGO_BIN_EXE_report-monitor");

#[test]
fn clean_prints_redacted_body() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let text = dir.path().join("referto.txt");
    fs::write(
        &text,
        "Istituto Scientifico di Lumezzane\n\
         Servizio di Diagnostica per Immagini\n\
         Sig./Sig.ra: MARIO ROSSI   ID Paziente: PK-1\n\
         Data di Nascita: 01/01/1950\n\
         Torace nella norma.\n",
    )?;

    let cmd = format!(
        "{BIN} --config {} clean {}",
        dir.path().join("none.toml").display(),
        text.display()
    );
    let mut session = spawn(&cmd, Some(10_000))?;
    session.exp_string("# profile: rx_maugeri")?;
    session.exp_string("# identifier: MARIO_ROSSI")?;
    session.exp_string("Torace nella norma.")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn clean_with_unknown_profile_lists_available() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let text = dir.path().join("referto.txt");
    fs::write(&text, "testo")?;

    let cmd = format!(
        "{BIN} --config {} clean {} --profile nope",
        dir.path().join("none.toml").display(),
        text.display()
    );
    let mut session = spawn(&cmd, Some(10_000))?;
    session.exp_string("unknown profile 'nope'")?;
    session.exp_string("rx_maugeri")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn profiles_lists_builtin_templates_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cmd = format!("{BIN} --config {} profiles", dir.path().join("none.toml").display());

    let mut session = spawn(&cmd, Some(10_000))?;
    session.exp_string("Document profiles (match order):")?;
    session.exp_string("rx_maugeri")?;
    session.exp_string("tsa_maugeri")?;
    session.exp_string("(default)")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn custom_profiles_are_tried_first() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let profiles = dir.path().join("profiles.toml");
    fs::write(
        &profiles,
        r#"
[[profile]]
name = "eco_addome"
identification = ["ecografia addome"]
identifier_capture = ['Paziente:\s+([A-Z]+\s+[A-Z]+)']
exclude = ['Paziente:']
"#,
    )?;
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "watch_dir = \"{}\"\nprofiles_file = \"{}\"\n",
            dir.path().display(),
            profiles.display()
        ),
    )?;
    let text = dir.path().join("eco.txt");
    fs::write(&text, "ECOGRAFIA ADDOME\nPaziente: ANNA BIANCHI\nFegato regolare.\n")?;

    let cmd = format!("{BIN} --config {} clean {}", config.display(), text.display());
    let mut session = spawn(&cmd, Some(10_000))?;
    session.exp_string("# profile: eco_addome")?;
    session.exp_string("# identifier: ANNA_BIANCHI")?;
    session.exp_string("ECOGRAFIA ADDOME Fegato regolare.")?;
    session.exp_eof()?;
    Ok(())
}
