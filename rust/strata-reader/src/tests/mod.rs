
mod lazy_loading;
mod result_reuse;
mod struct_nulls;
