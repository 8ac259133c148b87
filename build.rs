fn main() -> Result<(), Box<dyn std::error::Error>> {
    // SAFETY: build scripts are single threaded.
    unsafe {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    println!("cargo:rerun-if-changed=proto/model_service.proto");
    tonic_build::compile_protos("proto/model_service.proto")?;

    Ok(())
}
