#[cfg(test)]
mod ddl_test;
#[cfg(test)]
mod parser_test;
#[cfg(test)]
mod storage_test;
