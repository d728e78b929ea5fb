//! Post-setup instructions for the downstream `doc_rephraser.py` script.

use std::path::Path;

/// Name of the script this environment is prepared for.
pub const REPHRASER_SCRIPT: &str = "doc_rephraser.py";
pub const INPUT_DIR: &str = "input";
pub const OUTPUT_DIR: &str = "output";

fn activate_command(venv_dir: &Path) -> String {
    if cfg!(target_os = "windows") {
        format!("{}\\Scripts\\activate", venv_dir.display())
    } else {
        format!("source {}/bin/activate", venv_dir.display())
    }
}

pub fn usage_text(venv_dir: &Path) -> String {
    format!(
        "To use the document rephraser:\n\
         1. Activate the virtual environment:\n   {activate}\n\
         2. Place your .docx files in the '{input}' directory\n\
         3. Run the script:\n   python {script}\n\
         4. Rephrased documents are saved to the '{output}' directory\n\
         \n\
         To deactivate the virtual environment when done:\n   deactivate",
        activate = activate_command(venv_dir),
        input = INPUT_DIR,
        script = REPHRASER_SCRIPT,
        output = OUTPUT_DIR,
    )
}

/// `docrephrase usage`
pub fn cmd_usage(venv_dir: &Path) {
    println!("{}", usage_text(venv_dir));
}
