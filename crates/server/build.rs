fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Point tonic-build at the bundled protoc so the build does not depend
    // on a system-installed protobuf compiler.
    if std::env::var_os("PROTOC").is_none() {
        // SAFETY: set before any threads are spawned in this build script.
        unsafe {
            std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
        }
    }

    // Compile the proto file for the recommender service
    tonic_build::compile_protos("../../proto/recommender.proto")?;
    Ok(())
}
