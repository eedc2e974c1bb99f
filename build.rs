fn main() {
    // Generate C# bindings for .NET interop
    std::fs::create_dir_all("bindings").expect("Failed to create bindings directory");

    csbindgen::Builder::default()
        .input_extern_file("src/lib.rs")
        .input_extern_file("src/decoder.rs")
        .input_extern_file("src/encoder.rs")
        .input_extern_file("src/error.rs")
        .input_extern_file("src/types.rs")
        .csharp_dll_name("jxl_coder")
        .csharp_namespace("JxlCoder.Net")
        .csharp_class_name("NativeMethods")
        .csharp_class_accessibility("public")
        .csharp_use_nint_types(false) // Use UIntPtr/IntPtr for netstandard2.0 compatibility
        .generate_csharp_file("bindings/NativeMethods.g.cs")
        .expect("Failed to generate C# bindings");

    println!("cargo:rerun-if-changed=src/");
}
