//! Test fixtures: canned tool output, source archives and fake installs.

use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};

use crate::core::platform::Arch;

/// Header installed by every fake build, identical across architectures.
pub const EVENT_HEADER: &str = "#ifndef EVENT2_EVENT_H_INCLUDED_\n#define EVENT2_EVENT_H_INCLUDED_\n#endif\n";

/// JSON in the shape printed by `xcodebuild -showsdks -json`.
pub fn sdk_list_json(sdks: &[(&str, &str)]) -> String {
    let entries: Vec<serde_json::Value> = sdks
        .iter()
        .map(|(platform, path)| {
            serde_json::json!({
                "canonicalName": format!("{}17.0", platform),
                "displayName": format!("{} 17.0", platform),
                "isBaseSdk": true,
                "platform": platform,
                "platformPath": "/Applications/Xcode.app/Contents/Developer/Platforms",
                "platformVersion": "17.0",
                "sdkPath": path,
                "sdkVersion": "17.0",
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

/// A gzip tarball containing `<dir>/configure` and a header, shaped like an
/// upstream autotools release.
pub fn source_tarball(dir: &str) -> Vec<u8> {
    let mut data = Vec::new();
    {
        let encoder = GzEncoder::new(&mut data, Compression::default());
        let mut builder = Builder::new(encoder);

        let mut header = Header::new_gnu();
        header.set_path(format!("{}/", dir)).unwrap();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(EntryType::Directory);
        header.set_cksum();
        builder.append(&header, std::io::empty()).unwrap();

        let script = b"#!/bin/sh\nexit 0\n";
        let mut header = Header::new_gnu();
        header.set_path(format!("{}/configure", dir)).unwrap();
        header.set_size(script.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append(&header, &script[..]).unwrap();

        let mut header = Header::new_gnu();
        header.set_path(format!("{}/include/event2/event.h", dir)).unwrap();
        header.set_size(EVENT_HEADER.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, EVENT_HEADER.as_bytes()).unwrap();

        builder.into_inner().unwrap().finish().unwrap();
    }
    data
}

/// Populate `prefix` the way `make install` would: one archive per library
/// and a header tree.
pub fn install_fake_build(prefix: &Path, libraries: &[String], arch: Arch) {
    let lib = prefix.join("lib");
    let include = prefix.join("include/event2");
    std::fs::create_dir_all(&lib).unwrap();
    std::fs::create_dir_all(&include).unwrap();

    for name in libraries {
        std::fs::write(lib.join(name), format!("!<arch>\n{} {}\n", name, arch)).unwrap();
    }
    std::fs::write(include.join("event.h"), EVENT_HEADER).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_list_json_parses() {
        let json = sdk_list_json(&[("iphoneos", "/sdk/iPhoneOS.sdk")]);
        let sdks = crate::ops::sdk::parse_sdk_list(&json).unwrap();
        assert_eq!(sdks[0].platform, "iphoneos");
    }
}
