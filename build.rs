use std::error::Error;
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    // Builds outside of a git checkout fall back to an "unknown" describe string
    if EmitBuilder::builder()
        .fail_on_error()
        .custom_build_rs(".")
        .git_describe(true, false, Some("ThisPatternShouldNotMatchAnythingEver"))
        .emit()
        .is_err()
    {
        println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE=unknown");
    }
    Ok(())
}
