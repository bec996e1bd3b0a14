use std::env;

/// (cargo feature, target_arch value) for every architecture table in `src/arch`.
const TABLES: &[(&str, &str)] = &[
    ("mips64", "mips64"),
    ("loongarch64", "loongarch64"),
    ("aarch64", "aarch64"),
    ("riscv64", "riscv64"),
    ("ppc64", "powerpc64"),
];

fn feature_enabled(feature: &str) -> bool {
    let key = format!("CARGO_FEATURE_{}", feature.to_uppercase());
    env::var_os(key).is_some()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let names: Vec<String> = TABLES.iter().map(|(f, _)| format!("\"{}\"", f)).collect();
    println!("cargo:rustc-check-cfg=cfg(arch_table, values({}))", names.join(", "));

    let selected: Vec<&str> = TABLES
        .iter()
        .filter(|(feature, _)| feature_enabled(feature))
        .map(|(feature, _)| *feature)
        .collect();

    let table = match selected.as_slice() {
        [one] => *one,
        [] => {
            // No explicit selection: follow the compilation target.
            let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
            match TABLES.iter().find(|(_, arch)| *arch == target_arch) {
                Some((feature, _)) => *feature,
                None => panic!(
                    "no architecture table for target_arch `{}`; enable exactly one of the \
                     features {}",
                    target_arch,
                    names.join(", ")
                ),
            }
        }
        many => panic!(
            "more than one architecture table selected ({}); enable exactly one \
             (use `default-features = false` to drop the default `mips64`)",
            many.join(", ")
        ),
    };

    println!("cargo:rustc-cfg=arch_table=\"{}\"", table);
}
