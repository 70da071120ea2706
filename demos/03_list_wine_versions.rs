use lib_game_launch::get_wine_registry;

fn main() {
    let Some(registry) = get_wine_registry() else {
        println!("No home directory found.");
        return;
    };

    let versions = registry.get_installed_wine_versions();
    if versions.is_empty() {
        println!("No Wine versions installed.");
        return;
    }

    println!("Installed Wine versions ({}):", versions.len());
    for version in versions {
        match registry.get_wine_path_for_version(Some(version.as_str()), None) {
            Ok(path) => println!("\t- {version}: {}", path.to_string_lossy()),
            Err(e) => println!("\t- {version}: {e}"),
        }
    }

    match registry.get_default_wine_version(None) {
        Ok(version) => println!("Default: {version}"),
        Err(e) => println!("{e}"),
    }
}
